use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

fn main() {
    dotenvy::dotenv().ok();

    let players_db_sql = "CREATE TABLE players (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, title TEXT, race TEXT NOT NULL, profession TEXT NOT NULL, birthday INTEGER NOT NULL, experience INTEGER NOT NULL DEFAULT 0, level INTEGER NOT NULL DEFAULT 0, until_next_level INTEGER NOT NULL DEFAULT 0, banned INTEGER NOT NULL DEFAULT 0);";

    let players_db_path = std::env::var("PLAYER_DB").expect("PLAYER_DB env var not set");
    let parent = std::path::Path::new(&players_db_path)
        .parent()
        .expect("Failed to get parent directory of players DB path");
    if !parent.as_os_str().is_empty() && !parent.exists() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory for players DB");
        println!(
            "Created parent directory for players DB at {}",
            parent.display()
        );
    }

    if std::path::Path::new(&players_db_path).exists() {
        std::fs::remove_file(&players_db_path).expect("Failed to remove existing players DB");
        println!("Removed existing players DB at {}", players_db_path);
    }

    let players_db_manager = SqliteConnectionManager::file(&players_db_path);
    let players_db_pool = Pool::builder()
        .max_size(5)
        .build(players_db_manager)
        .expect("Failed to create DB pool");
    let conn = players_db_pool.get().expect("Failed to get DB connection");
    conn.execute_batch(players_db_sql)
        .expect("Failed to create players table");

    println!("Created new players DB at {}", players_db_path);
}
