//! Database bootstrap: create the database if missing, then the admin tables.
//! Every statement is idempotent, so this runs on every start.

use crate::error::{AppError, ConfigError, StoreError};
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Column definitions per table. Referenced tables come first.
const TABLES: &[(&str, &str)] = &[
    (
        "services",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        description TEXT,
        icon TEXT,
        features JSONB NOT NULL DEFAULT '[]'::jsonb,
        price_from NUMERIC,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "contact_messages",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT,
        subject TEXT,
        message TEXT,
        status TEXT NOT NULL DEFAULT 'new',
        replied_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "testimonials",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        role TEXT,
        company TEXT,
        content TEXT NOT NULL,
        rating INTEGER CHECK (rating BETWEEN 1 AND 5),
        avatar_url TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        is_featured BOOLEAN NOT NULL DEFAULT FALSE,
        approved_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "products",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        description TEXT,
        category TEXT,
        price NUMERIC CHECK (price >= 0),
        image_url TEXT,
        in_stock BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "quotes",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        service_id UUID REFERENCES {schema}."services"(id) ON DELETE SET NULL,
        contact_id UUID REFERENCES {schema}."contact_messages"(id) ON DELETE SET NULL,
        name TEXT,
        email TEXT,
        phone TEXT,
        details TEXT,
        budget TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
];

/// Create `schema` and the admin tables inside it when absent.
pub async fn ensure_tables(pool: &PgPool, schema: &str) -> Result<(), StoreError> {
    let schema = quote(schema);
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
        .execute(pool)
        .await?;
    for (table, columns) in TABLES {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {}.{} ({})",
            schema,
            quote(table),
            columns.replace("{schema}", &schema)
        );
        sqlx::query(&ddl).execute(pool).await?;
        tracing::debug!(table = %table, "table ensured");
    }
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|e| {
        ConfigError::InvalidValue {
            key: "DATABASE_URL",
            reason: e.to_string(),
        }
    })?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(StoreError::from)?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await
            .map_err(StoreError::from)?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let path_start = url.rfind('/').ok_or_else(|| ConfigError::InvalidValue {
        key: "DATABASE_URL",
        reason: "no database path".into(),
    })? + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_url_points_at_postgres_database() {
        let (admin, name) =
            parse_db_name_from_url("postgres://u:p@localhost:5432/backoffice?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(name, "backoffice");
    }

    #[test]
    fn url_without_path_is_rejected() {
        assert!(parse_db_name_from_url("not-a-url").is_err());
    }

    #[test]
    fn referenced_tables_are_created_first() {
        let order: Vec<&str> = TABLES.iter().map(|(t, _)| *t).collect();
        let pos = |t: &str| order.iter().position(|x| *x == t).unwrap();
        assert!(pos("services") < pos("quotes"));
        assert!(pos("contact_messages") < pos("quotes"));
    }
}
