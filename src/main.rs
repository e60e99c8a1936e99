use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::{dptree, prelude::*};
use tracing::{error, info};

use tg_airwatch::broadcast;
use tg_airwatch::config;
use tg_airwatch::db;
use tg_airwatch::handlers;
use tg_airwatch::outbound::TelegramOutbound;
use tg_airwatch::upstream::UpstreamClient;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database_url());
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let base_url = reqwest::Url::parse(&cfg.upstream.base_url)?;
    let upstream = Arc::new(UpstreamClient::new(base_url, cfg.upstream.credential.clone()));

    let bot = Bot::new(cfg.telegram.bot_token.clone());

    // Daily trigger loop (background): sleep until the next fire instant,
    // run one broadcast to completion, sleep again. Runs never overlap.
    {
        let pool = pool.clone();
        let upstream = upstream.clone();
        let outbound = TelegramOutbound::new(bot.clone());
        tokio::spawn(async move {
            loop {
                let wait = broadcast::duration_until_next(chrono::Local::now().naive_local());
                tokio::time::sleep(wait).await;
                if let Err(err) = broadcast::broadcast_once(
                    &pool,
                    upstream.as_ref(),
                    &outbound,
                    broadcast::PACING,
                )
                .await
                {
                    error!(?err, "broadcast run aborted");
                }
            }
        });
    }

    info!("starting telegram bot");
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![pool, upstream, Arc::new(cfg)])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn on_message(
    bot: Bot,
    msg: Message,
    pool: sqlx::SqlitePool,
    upstream: Arc<UpstreamClient>,
    cfg: Arc<config::Config>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let outbound = TelegramOutbound::new(bot);
    if let Err(err) = handlers::handle_message(
        &outbound,
        &pool,
        upstream.as_ref(),
        &cfg.upstream.calendar_url,
        msg.chat.id.0,
        text,
    )
    .await
    {
        error!(?err, "failed to handle message");
    }
    Ok(())
}

async fn on_callback(
    bot: Bot,
    q: CallbackQuery,
    upstream: Arc<UpstreamClient>,
) -> ResponseResult<()> {
    let (Some(payload), Some(message)) = (q.data.as_deref(), q.message.as_ref()) else {
        return Ok(());
    };
    let outbound = TelegramOutbound::new(bot);
    if let Err(err) = handlers::handle_callback(
        &outbound,
        upstream.as_ref(),
        message.chat.id.0,
        &q.id,
        payload,
    )
    .await
    {
        error!(?err, "failed to handle callback");
    }
    Ok(())
}
