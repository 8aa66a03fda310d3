//! Debezium PostgreSQL connector configuration payload.

use serde::{Deserialize, Serialize};

/// Matches Debezium's `<prefix>.<schema>.<table>` topic names.
pub const ROUTE_REGEX: &str = r"([^.]+)\.([^.]+)\.([^.]+)";

/// Settings the connector payload is built from.
///
/// Defaults reproduce the reference docker-compose deployment.
#[derive(Clone)]
pub struct ConnectorSettings {
    /// Connector name as registered with Kafka Connect
    pub name: String,
    /// Source database host as seen from the Connect worker
    pub database_hostname: String,
    pub database_port: u16,
    pub database_user: String,
    pub database_password: String,
    pub database_dbname: String,
    /// Logical server name
    pub server_name: String,
    pub source_schema: String,
    pub source_table: String,
    /// Prefix of the raw three-part topic names
    pub topic_prefix: String,
    pub plugin_name: String,
    pub slot_name: String,
    pub publication_name: String,
    /// Brokers for the schema-history topic
    pub history_bootstrap_servers: String,
    /// Prefix of the two-part topic the route transform produces
    pub route_prefix: String,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            name: "postgres-connector".to_string(),
            database_hostname: "postgres".to_string(),
            database_port: 5432,
            database_user: "postgres".to_string(),
            database_password: "postgres".to_string(),
            database_dbname: "testdb".to_string(),
            server_name: "dbserver1".to_string(),
            source_schema: "public".to_string(),
            source_table: "tablea".to_string(),
            topic_prefix: "dbserver1".to_string(),
            plugin_name: "pgoutput".to_string(),
            slot_name: "debezium".to_string(),
            publication_name: "dbz_publication".to_string(),
            history_bootstrap_servers: "kafka:29092".to_string(),
            route_prefix: "cdc".to_string(),
        }
    }
}

impl std::fmt::Debug for ConnectorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorSettings")
            .field("name", &self.name)
            .field("database_hostname", &self.database_hostname)
            .field("database_port", &self.database_port)
            .field("database_dbname", &self.database_dbname)
            .field("source", &format!("{}.{}", self.source_schema, self.source_table))
            .field("routed_topic", &self.routed_topic())
            .finish_non_exhaustive()
    }
}

impl ConnectorSettings {
    /// Topic the route transform delivers changes to: `<route prefix>.<table>`.
    pub fn routed_topic(&self) -> String {
        format!("{}.{}", self.route_prefix, self.source_table)
    }

    /// Build the `POST /connectors` body.
    pub fn to_request(&self) -> ConnectorRequest {
        ConnectorRequest {
            name: self.name.clone(),
            config: DebeziumPostgresConfig {
                connector_class: "io.debezium.connector.postgresql.PostgresConnector".to_string(),
                tasks_max: "1".to_string(),
                database_hostname: self.database_hostname.clone(),
                database_port: self.database_port.to_string(),
                database_user: self.database_user.clone(),
                database_password: self.database_password.clone(),
                database_dbname: self.database_dbname.clone(),
                database_server_name: self.server_name.clone(),
                table_include_list: format!("{}.{}", self.source_schema, self.source_table),
                topic_prefix: self.topic_prefix.clone(),
                plugin_name: self.plugin_name.clone(),
                slot_name: self.slot_name.clone(),
                publication_name: self.publication_name.clone(),
                publication_autocreate_mode: "filtered".to_string(),
                schema_history_bootstrap_servers: self.history_bootstrap_servers.clone(),
                schema_history_topic: format!("schema-changes.{}", self.database_dbname),
                transforms: "route".to_string(),
                transforms_route_type: "org.apache.kafka.connect.transforms.RegexRouter"
                    .to_string(),
                transforms_route_regex: ROUTE_REGEX.to_string(),
                transforms_route_replacement: format!("{}.$3", self.route_prefix),
            },
        }
    }
}

/// `POST /connectors` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorRequest {
    pub name: String,
    pub config: DebeziumPostgresConfig,
}

/// The `config` object of a Debezium PostgreSQL connector.
///
/// Kafka Connect expects every value as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebeziumPostgresConfig {
    #[serde(rename = "connector.class")]
    pub connector_class: String,
    #[serde(rename = "tasks.max")]
    pub tasks_max: String,
    #[serde(rename = "database.hostname")]
    pub database_hostname: String,
    #[serde(rename = "database.port")]
    pub database_port: String,
    #[serde(rename = "database.user")]
    pub database_user: String,
    #[serde(rename = "database.password")]
    pub database_password: String,
    #[serde(rename = "database.dbname")]
    pub database_dbname: String,
    #[serde(rename = "database.server.name")]
    pub database_server_name: String,
    #[serde(rename = "table.include.list")]
    pub table_include_list: String,
    #[serde(rename = "topic.prefix")]
    pub topic_prefix: String,
    #[serde(rename = "plugin.name")]
    pub plugin_name: String,
    #[serde(rename = "slot.name")]
    pub slot_name: String,
    #[serde(rename = "publication.name")]
    pub publication_name: String,
    #[serde(rename = "publication.autocreate.mode")]
    pub publication_autocreate_mode: String,
    #[serde(rename = "schema.history.internal.kafka.bootstrap.servers")]
    pub schema_history_bootstrap_servers: String,
    #[serde(rename = "schema.history.internal.kafka.topic")]
    pub schema_history_topic: String,
    pub transforms: String,
    #[serde(rename = "transforms.route.type")]
    pub transforms_route_type: String,
    #[serde(rename = "transforms.route.regex")]
    pub transforms_route_regex: String,
    #[serde(rename = "transforms.route.replacement")]
    pub transforms_route_replacement: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_request_matches_deployment() {
        let request = ConnectorSettings::default().to_request();
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "name": "postgres-connector",
                "config": {
                    "connector.class": "io.debezium.connector.postgresql.PostgresConnector",
                    "tasks.max": "1",
                    "database.hostname": "postgres",
                    "database.port": "5432",
                    "database.user": "postgres",
                    "database.password": "postgres",
                    "database.dbname": "testdb",
                    "database.server.name": "dbserver1",
                    "table.include.list": "public.tablea",
                    "topic.prefix": "dbserver1",
                    "plugin.name": "pgoutput",
                    "slot.name": "debezium",
                    "publication.name": "dbz_publication",
                    "publication.autocreate.mode": "filtered",
                    "schema.history.internal.kafka.bootstrap.servers": "kafka:29092",
                    "schema.history.internal.kafka.topic": "schema-changes.testdb",
                    "transforms": "route",
                    "transforms.route.type": "org.apache.kafka.connect.transforms.RegexRouter",
                    "transforms.route.regex": "([^.]+)\\.([^.]+)\\.([^.]+)",
                    "transforms.route.replacement": "cdc.$3"
                }
            })
        );
    }

    #[test]
    fn test_routed_topic_follows_table_and_prefix() {
        let settings = ConnectorSettings {
            source_schema: "inventory".to_string(),
            source_table: "orders".to_string(),
            route_prefix: "relay".to_string(),
            database_dbname: "shop".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.routed_topic(), "relay.orders");

        let request = settings.to_request();
        assert_eq!(request.config.table_include_list, "inventory.orders");
        assert_eq!(request.config.transforms_route_replacement, "relay.$3");
        assert_eq!(request.config.schema_history_topic, "schema-changes.shop");
    }

    #[test]
    fn test_debug_hides_password() {
        let settings = ConnectorSettings {
            database_password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{settings:?}").contains("hunter2"));
    }
}
