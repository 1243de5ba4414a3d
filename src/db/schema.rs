//! SQLite schema for the cached collections, favourites and preferences.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS Stops (
    Sms TEXT PRIMARY KEY,
    Name TEXT NOT NULL,
    FullName TEXT NOT NULL,
    Farezone TEXT,
    Lat TEXT,
    Long TEXT,
    LastModified TEXT
);

CREATE TABLE IF NOT EXISTS Services (
    Code TEXT PRIMARY KEY,
    Name TEXT NOT NULL,
    Mode TEXT NOT NULL,
    LastModified TEXT
);

-- Favourites are owned by the user and never touched by a refresh
CREATE TABLE IF NOT EXISTS FavouriteStops (
    Sms TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS FavouriteServices (
    Code TEXT PRIMARY KEY
);

-- Key-value preferences (last refresh timestamps)
CREATE TABLE IF NOT EXISTS Preferences (
    Key TEXT PRIMARY KEY,
    Value TEXT NOT NULL
);
"#;
