use super::StoreError;
use crate::models::{Article, Content, FieldType, Meme, NewsItem, Wallpaper};
use sqlx::PgPool;
use tracing::info;

/// Ensure the content tables exist.
///
/// Created lazily at startup so fresh environments work without a separate
/// migration step. Each table carries a UNIQUE constraint on its natural key.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    info!("Ensuring content tables exist");

    ensure_table::<Article>(pool).await?;
    ensure_table::<Meme>(pool).await?;
    ensure_table::<Wallpaper>(pool).await?;
    ensure_table::<NewsItem>(pool).await?;

    Ok(())
}

async fn ensure_table<T: Content>(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(&table_ddl::<T>()).execute(pool).await?;
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_created_at ON {table} (created_at DESC)",
        table = T::TABLE
    ))
    .execute(pool)
    .await?;
    Ok(())
}

fn column_type(ty: FieldType) -> &'static str {
    match ty {
        FieldType::Text => "TEXT NOT NULL DEFAULT ''",
        FieldType::TextList => "TEXT[] NOT NULL DEFAULT '{}'",
        FieldType::SmallInt => "SMALLINT NOT NULL DEFAULT 0",
        FieldType::Timestamp => "TIMESTAMPTZ NOT NULL DEFAULT NOW()",
    }
}

pub(crate) fn table_ddl<T: Content>() -> String {
    let mut columns: Vec<String> = T::FIELDS
        .iter()
        .map(|spec| format!("    {} {}", spec.name, column_type(spec.ty)))
        .collect();

    let [first, second] = T::KEY_FIELDS;
    columns.push(format!(
        "    CONSTRAINT {}_natural_key UNIQUE ({}, {})",
        T::TABLE,
        first,
        second
    ));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        T::TABLE,
        columns.join(",\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallpaper_ddl_has_natural_key_constraint() {
        let ddl = table_ddl::<Wallpaper>();
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS wallpapers"));
        assert!(ddl.contains("CONSTRAINT wallpapers_natural_key UNIQUE (image_name, topic)"));
    }

    #[test]
    fn test_news_ddl_column_types() {
        let ddl = table_ddl::<NewsItem>();
        assert!(ddl.contains("censor SMALLINT NOT NULL DEFAULT 0"));
        assert!(ddl.contains("created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
        assert!(table_ddl::<Article>().contains("topics TEXT[] NOT NULL DEFAULT '{}'"));
    }
}
