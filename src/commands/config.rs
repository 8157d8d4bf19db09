use std::process;

use crate::app::App;
use crate::queue::store;

/// Keys are addressed with either spelling on the command line; the store
/// only ever sees the underscore form.
pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
}

pub async fn handle_config_set_command(app: &App, key: &str, value: &str) {
    let key = normalize_key(key);

    match store::with_busy_retry(|| store::set_config(&app.db, &key, value)).await {
        Ok(()) => println!("{key}={value}"),
        Err(err) => {
            eprintln!("failed to set {key}: {err}");
            process::exit(1);
        }
    }
}

pub async fn handle_config_get_command(app: &App, key: &str) {
    let key = normalize_key(key);

    match store::with_busy_retry(|| store::get_config(&app.db, &key)).await {
        Ok(Some(value)) => println!("{value}"),
        Ok(None) => println!("not found"),
        Err(err) => {
            eprintln!("failed to read {key}: {err}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::setup_test::setup_test_queue;

    #[test]
    fn hyphens_normalize_to_underscores() {
        assert_eq!(normalize_key("max-retries"), "max_retries");
        assert_eq!(normalize_key("max_retries"), "max_retries");
        assert_eq!(normalize_key("workers-should-stop"), "workers_should_stop");
    }

    #[tokio::test]
    async fn either_spelling_reaches_the_same_key() {
        let queue = setup_test_queue().await;

        store::set_config(&queue.app.db, &normalize_key("max-retries"), "3")
            .await
            .unwrap();

        assert_eq!(
            store::get_config(&queue.app.db, &normalize_key("max_retries"))
                .await
                .unwrap(),
            Some("3".to_string())
        );
    }
}
