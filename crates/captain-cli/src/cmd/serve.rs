use crate::context::Context;
use anyhow::Context as _;
use captain_core::config::WarnLevel;
use captain_core::db::CardDb;
use captain_server::AppState;
use std::path::PathBuf;
use std::time::Duration;

pub fn run(ctx: &Context, port: Option<u16>, db: Option<PathBuf>) -> anyhow::Result<()> {
    let server = &ctx.config.server;
    for w in ctx.config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => tracing::error!("config: {}", w.message),
        }
    }

    let db_path = db.unwrap_or_else(|| ctx.config.db_path(&ctx.config_path));
    let port = port.unwrap_or(server.port);
    let card_db = CardDb::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    if server.card_secret.is_none() {
        tracing::warn!("server.card_secret not set: any card id is accepted");
    }
    let state = AppState::new(
        card_db,
        Duration::from_secs(server.robot_timeout_secs),
        server.card_secret.clone(),
    )?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        println!(
            "Captain card store on http://localhost:{actual_port}/v1  (db {})",
            db_path.display()
        );

        tokio::select! {
            res = captain_server::serve_on(state, listener) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
