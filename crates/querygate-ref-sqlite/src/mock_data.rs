//! Sample shop data for the reference runtime.
//!
//! All data in this module is fictional.

use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE customers (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    region      TEXT NOT NULL,
    signup_date TEXT NOT NULL
);
CREATE TABLE products (
    id       INTEGER PRIMARY KEY,
    name     TEXT NOT NULL,
    category TEXT NOT NULL,
    price    REAL NOT NULL
);
CREATE TABLE orders (
    id          INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL REFERENCES customers(id),
    product_id  INTEGER NOT NULL REFERENCES products(id),
    quantity    INTEGER NOT NULL,
    total       REAL NOT NULL,
    order_date  TEXT NOT NULL
);
";

const ROWS: &str = "
INSERT INTO customers (id, name, region, signup_date) VALUES
    (1, 'Ada Lovelace',   'EMEA', '2023-02-11'),
    (2, 'Grace Hopper',   'AMER', '2023-05-30'),
    (3, 'Alan Turing',    'EMEA', '2023-09-02'),
    (4, 'Katherine Johnson', 'AMER', '2024-01-17'),
    (5, 'Tu Youyou',      'APAC', '2024-03-08');

INSERT INTO products (id, name, category, price) VALUES
    (1, 'Mechanical keyboard', 'hardware', 89.0),
    (2, 'USB-C dock',          'hardware', 149.0),
    (3, 'Code editor licence', 'software', 59.0),
    (4, 'Cloud backup (1y)',   'service',  120.0);

INSERT INTO orders (id, customer_id, product_id, quantity, total, order_date) VALUES
    (1, 1, 1, 1,  89.0, '2023-11-03'),
    (2, 1, 3, 2, 118.0, '2024-02-14'),
    (3, 2, 2, 1, 149.0, '2024-02-20'),
    (4, 3, 4, 1, 120.0, '2024-03-01'),
    (5, 4, 1, 3, 267.0, '2024-04-12'),
    (6, 5, 2, 2, 298.0, '2024-05-09'),
    (7, 2, 4, 1, 120.0, '2024-06-21');
";

/// Create the sample tables and rows.
pub fn seed(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    conn.execute_batch(ROWS)
}
