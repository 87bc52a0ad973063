//! Watch command implementation
//!
//! Resolves a namespace, prints it, and reloads the source each time the
//! process receives SIGHUP. A failed reload is reported and the previous
//! configuration keeps being served. Ctrl+C or SIGTERM ends the command.

use crate::cli::{exit_code, GlobalArgs, EXIT_OK};
use crate::core::{ConfigTree, Resolver};
use crate::domain::Result;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the watch command
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Namespace to resolve, e.g. `pyms.config`
    pub namespace: String,
}

impl WatchArgs {
    /// Execute the watch command
    ///
    /// Resolution runs on the blocking pool since adapters may perform
    /// blocking HTTP calls.
    pub async fn execute(
        &self,
        global: &GlobalArgs,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let resolver = {
            let global = global.clone();
            tokio::task::spawn_blocking(move || Arc::new(global.resolver_builder().build())).await?
        };

        let code = match self.resolve(&resolver).await? {
            Ok(tree) => {
                let printed = print_tree(&self.namespace, resolver.generation(), &tree);
                release(tree).await?;
                printed?;
                self.watch_loop(&resolver, &mut shutdown_signal).await?;
                EXIT_OK
            }
            Err(e) => {
                println!("❌ Failed to resolve {}", self.namespace);
                println!("   Error: {e}");
                exit_code(&e)
            }
        };

        release(resolver).await?;
        Ok(code)
    }

    async fn resolve(&self, resolver: &Arc<Resolver>) -> anyhow::Result<Result<Arc<ConfigTree>>> {
        let resolver = Arc::clone(resolver);
        let namespace = self.namespace.clone();
        Ok(tokio::task::spawn_blocking(move || resolver.resolve(&namespace)).await?)
    }

    async fn reload(&self, resolver: &Arc<Resolver>) -> anyhow::Result<Result<u64>> {
        let resolver = Arc::clone(resolver);
        Ok(tokio::task::spawn_blocking(move || resolver.reload()).await?)
    }

    #[cfg(unix)]
    async fn watch_loop(
        &self,
        resolver: &Arc<Resolver>,
        shutdown_signal: &mut watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangup = signal(SignalKind::hangup())?;
        tracing::info!(namespace = %self.namespace, "Watching for SIGHUP");

        loop {
            tokio::select! {
                _ = hangup.recv() => {
                    tracing::info!("Received SIGHUP, reloading configuration");
                    match self.reload(resolver).await? {
                        Ok(generation) => match self.resolve(resolver).await? {
                            Ok(tree) => {
                                let printed = print_tree(&self.namespace, Some(generation), &tree);
                                release(tree).await?;
                                printed?;
                            }
                            Err(e) => println!("⚠️  Reloaded, but {} no longer resolves: {e}", self.namespace),
                        },
                        Err(e) => {
                            println!("⚠️  Reload failed, keeping generation {:?}: {e}", resolver.generation());
                        }
                    }
                }
                _ = shutdown_signal.changed() => {
                    tracing::info!("Shutdown requested, stopping watch");
                    return Ok(());
                }
            }
        }
    }

    #[cfg(not(unix))]
    async fn watch_loop(
        &self,
        _resolver: &Arc<Resolver>,
        shutdown_signal: &mut watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        tracing::warn!("SIGHUP is not available on this platform; waiting for shutdown");
        let _ = shutdown_signal.changed().await;
        Ok(())
    }
}

/// Drops a value on the blocking pool
///
/// Trees and resolvers may hold the last reference to a remote key adapter,
/// whose blocking HTTP client must not be dropped on a runtime thread.
async fn release<T: Send + 'static>(value: T) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || drop(value)).await?;
    Ok(())
}

fn print_tree(namespace: &str, generation: Option<u64>, tree: &ConfigTree) -> anyhow::Result<()> {
    println!(
        "# {namespace} (generation {})",
        generation.map_or_else(|| "-".to_string(), |g| g.to_string())
    );
    println!("{}", serde_json::to_string_pretty(&tree.to_json())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::crypt::RemoteKms;
    use crate::config::KmsConfig;

    #[tokio::test]
    async fn test_release_drops_remote_adapter_off_runtime() {
        let tree = tokio::task::spawn_blocking(|| {
            let kms = RemoteKms::new(KmsConfig::new("http://localhost:8200")).unwrap();
            Arc::new(ConfigTree::empty_with_crypt(false, Arc::new(kms)))
        })
        .await
        .unwrap();

        // The tree holds the only reference to the adapter and its client.
        assert_eq!(Arc::strong_count(tree.crypt()), 1);
        release(tree).await.unwrap();
    }

    #[tokio::test]
    async fn test_watch_stops_on_shutdown() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            "pyms:\n  crypt:\n    method: aws_kms\n    kms:\n      endpoint: http://localhost:8200\n  config:\n    DEBUG: true\n",
        )
        .unwrap();

        let global = GlobalArgs {
            config: Some(path),
            key_file: None,
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let args = WatchArgs {
            namespace: "pyms.config".to_string(),
        };
        assert_eq!(args.execute(&global, shutdown_rx).await.unwrap(), EXIT_OK);
    }
}
