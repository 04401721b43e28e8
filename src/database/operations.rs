/// Database operations for storing station samples
use async_trait::async_trait;
use log::info;
use tokio_postgres::types::ToSql;

use crate::database::connection::execute_with_retry;
use crate::error::SinkError;
use crate::models::{CanonicalField, RawSample};
use crate::storage::SampleSink;

/// `CREATE TABLE` statement with a time key and one column per field
pub fn create_table_sql(table: &str) -> String {
    let columns: Vec<String> = CanonicalField::ALL
        .iter()
        .map(|f| format!("{} DOUBLE PRECISION", f.name()))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (time TIMESTAMPTZ PRIMARY KEY, {})",
        table,
        columns.join(", ")
    )
}

pub fn insert_sql(table: &str) -> String {
    let names: Vec<&str> = CanonicalField::ALL.iter().map(|f| f.name()).collect();
    let placeholders: Vec<String> = (1..=names.len() + 1).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {}(time, {}) VALUES ({})",
        table,
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Create the sample table if it does not exist yet
pub async fn create_table(database_url: &str, table: &str) -> Result<(), String> {
    info!("Create table {} if not exists.", table);
    let sql = create_table_sql(table);

    execute_with_retry(database_url, move |client| {
        let sql = sql.clone();
        async move { client.execute(sql.as_str(), &[]).await }
    })
    .await
}

/// Store one sample as a table row; missing values become NULL
pub async fn store_sample(
    database_url: &str,
    table: &str,
    sample: &RawSample,
) -> Result<(), String> {
    let sql = insert_sql(table);
    let sample = sample.clone();

    execute_with_retry(database_url, move |client| {
        let sql = sql.clone();
        let sample = sample.clone();
        async move {
            let values: Vec<Option<f64>> = sample.values.iter().map(|(_, v)| v).collect();
            let mut params: Vec<&(dyn ToSql + Sync)> = vec![&sample.time];
            params.extend(values.iter().map(|v| v as &(dyn ToSql + Sync)));
            client.execute(sql.as_str(), &params).await
        }
    })
    .await
}

/// PostgreSQL sink; the table is created on construction
pub struct PostgresSink {
    database_url: String,
    table: String,
}

impl PostgresSink {
    pub async fn connect(database_url: &str, table: &str) -> Result<Self, SinkError> {
        create_table(database_url, table)
            .await
            .map_err(SinkError::Database)?;
        Ok(Self {
            database_url: database_url.to_string(),
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl SampleSink for PostgresSink {
    fn name(&self) -> &str {
        "database"
    }

    async fn record(&mut self, sample: &RawSample) -> Result<(), SinkError> {
        store_sample(&self.database_url, &self.table, sample)
            .await
            .map_err(SinkError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_has_a_placeholder_per_column() {
        let sql = insert_sql("meteo");
        assert!(sql.starts_with("INSERT INTO meteo(time, air_temperature, rel_humidity,"));
        assert!(sql.ends_with("$14, $15)"));
    }

    #[test]
    fn table_has_time_key_and_float_columns() {
        let sql = create_table_sql("meteo");
        assert!(sql.contains("time TIMESTAMPTZ PRIMARY KEY"));
        assert!(sql.contains("heating_temperature DOUBLE PRECISION"));
    }
}
