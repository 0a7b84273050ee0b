use crate::adapters::shell::shell_quote;
use crate::config::MongoSettings;
use crate::core::parser;
use crate::domain::model::Record;
use crate::domain::ports::QueryExecutor;
use serde_json::Value;

/// `mongosh` inside the database container, driven one `--eval` at a time.
pub struct MongoShell<'a, E: QueryExecutor> {
    executor: &'a E,
    settings: &'a MongoSettings,
}

impl<'a, E: QueryExecutor> MongoShell<'a, E> {
    pub fn new(executor: &'a E, settings: &'a MongoSettings) -> Self {
        Self { executor, settings }
    }

    pub fn command_for(&self, script: &str) -> String {
        format!(
            "docker exec {} mongosh -u {} -p {} --authenticationDatabase {} --quiet --eval {}",
            self.settings.container,
            self.settings.user,
            shell_quote(&self.settings.password),
            self.settings.auth_database,
            shell_quote(script)
        )
    }

    /// Trimmed stdout of a successful evaluation.
    pub async fn eval(&self, script: &str) -> Option<String> {
        let output = self.executor.execute(&self.command_for(script)).await;
        match output.failure_reason() {
            None => Some(output.stdout.trim().to_string()),
            Some(reason) => {
                tracing::warn!("mongosh evaluation failed: {}", reason);
                None
            }
        }
    }

    pub async fn ping(&self) -> bool {
        let Some(reply) = self
            .eval("EJSON.stringify(db.adminCommand({ping: 1}), {relaxed: true})")
            .await
        else {
            return false;
        };
        parser::parse_json_document(&reply)
            .and_then(|doc| doc.get("ok").and_then(Value::as_f64))
            .is_some_and(|ok| ok == 1.0)
    }

    pub async fn count_documents(&self, collection: &str) -> Option<u64> {
        let script = format!(
            "db.getSiblingDB(\"{}\").{}.countDocuments()",
            self.settings.database, collection
        );
        let reply = self.eval(&script).await?;
        let count = parser::parse_count(&reply);
        if count.is_none() {
            tracing::warn!("{}: could not parse count from {:?}", collection, reply);
        }
        count
    }

    /// Runs an aggregation and decodes its result array; `None` means no data.
    pub async fn aggregate(&self, collection: &str, stages: &str) -> Option<Vec<Record>> {
        let script = aggregate_script(&self.settings.database, collection, stages);
        let reply = self.eval(&script).await?;
        let records = parser::parse_json_array(&reply);
        if records.is_none() {
            tracing::warn!(
                "Could not parse JSON result. Raw output: {}",
                parser::truncate_display(&reply, 200)
            );
        }
        records
    }
}

pub fn aggregate_script(database: &str, collection: &str, stages: &str) -> String {
    format!(
        "EJSON.stringify(db.getSiblingDB(\"{}\").{}.aggregate({}).toArray(), {{relaxed: true}})",
        database,
        collection,
        stages.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CommandOutput, CommandStatus};
    use std::sync::Mutex;
    use std::time::Duration;

    struct CannedExecutor {
        reply: CommandOutput,
        seen: Mutex<Vec<String>>,
    }

    impl CannedExecutor {
        fn replying(code: i32, stdout: &str) -> Self {
            Self {
                reply: CommandOutput {
                    status: CommandStatus::Exited(code),
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                    elapsed: Duration::from_millis(1),
                },
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl QueryExecutor for CannedExecutor {
        async fn execute(&self, command: &str) -> CommandOutput {
            self.seen.lock().unwrap().push(command.to_string());
            self.reply.clone()
        }
    }

    #[test]
    fn test_command_quotes_script_for_shell() {
        let settings = MongoSettings::default();
        let executor = CannedExecutor::replying(0, "");
        let shell = MongoShell::new(&executor, &settings);

        let command = shell.command_for(r#"db.x.aggregate([{"$unwind": "$items"}])"#);
        assert!(command.starts_with(
            "docker exec mongodb mongosh -u admin -p 'password' --authenticationDatabase admin --quiet --eval '"
        ));
        assert!(command.ends_with(r#"[{"$unwind": "$items"}])'"#));
    }

    #[tokio::test]
    async fn test_ping_requires_ok_one() {
        let settings = MongoSettings::default();

        let ok = CannedExecutor::replying(0, "{\"ok\":1}\n");
        assert!(MongoShell::new(&ok, &settings).ping().await);

        let not_ok = CannedExecutor::replying(0, "{\"ok\":0}");
        assert!(!MongoShell::new(&not_ok, &settings).ping().await);

        let failed = CannedExecutor::replying(1, "{\"ok\":1}");
        assert!(!MongoShell::new(&failed, &settings).ping().await);
    }

    #[tokio::test]
    async fn test_count_documents_targets_database() {
        let settings = MongoSettings::default();
        let executor = CannedExecutor::replying(0, "2500\n");
        let shell = MongoShell::new(&executor, &settings);

        assert_eq!(shell.count_documents("transactions").await, Some(2500));
        let seen = executor.seen.lock().unwrap();
        assert!(seen[0].contains(r#"db.getSiblingDB("ecommerce_db").transactions.countDocuments()"#));
    }

    #[tokio::test]
    async fn test_aggregate_decodes_records() {
        let settings = MongoSettings::default();
        let executor =
            CannedExecutor::replying(0, r#"[{"_id":"cat_001","totalRevenue":10.5,"totalUnits":2}]"#);
        let shell = MongoShell::new(&executor, &settings);

        let records = shell.aggregate("transactions", "[]").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_str("_id"), Some("cat_001"));
    }

    #[tokio::test]
    async fn test_aggregate_with_shell_syntax_output_is_no_data() {
        let settings = MongoSettings::default();
        let executor = CannedExecutor::replying(0, "[ { _id: 'cat_001' } ]");
        let shell = MongoShell::new(&executor, &settings);
        assert!(shell.aggregate("transactions", "[]").await.is_none());
    }

    #[test]
    fn test_aggregate_script_wraps_pipeline() {
        let script = aggregate_script("ecommerce_db", "transactions", "\n [ {\"$limit\": 1} ]\n");
        assert_eq!(
            script,
            r#"EJSON.stringify(db.getSiblingDB("ecommerce_db").transactions.aggregate([ {"$limit": 1} ]).toArray(), {relaxed: true})"#
        );
    }
}
