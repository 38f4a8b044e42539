pub mod app_command;
pub mod catalog;
pub mod course;
pub mod load;

pub use app_command::{AppCommand, USAGE};

use crate::app_state::AppEvent;
use crate::catalog::CatalogError;
use log::{error, warn};
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;

/// 执行一条命令，结果以事件形式发回。返回命令是否成功。
pub async fn dispatch(
    cmd: AppCommand,
    db: &DatabaseConnection,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
) -> bool {
    let result = match cmd {
        AppCommand::Load { path, mode } => load::run(&path, mode, db, evt_tx).await,
        AppCommand::Validate { path } => load::validate(&path, evt_tx),
        AppCommand::Courses => catalog::courses(db, evt_tx).await,
        AppCommand::Outline { course } => course::outline(&course, db, evt_tx).await,
        AppCommand::Resequence { course, module } => {
            course::resequence(&course, module.as_deref(), db, evt_tx).await
        }
        AppCommand::Reorder { course, slugs } => {
            course::reorder(&course, &slugs, db, evt_tx).await
        }
        AppCommand::RemoveModule { course, module } => {
            course::remove_module(&course, &module, db, evt_tx).await
        }
        AppCommand::Clone {
            source,
            new_slug,
            title,
        } => course::clone(&source, &new_slug, &title, db, evt_tx).await,
        AppCommand::FixCertTracks => catalog::fix_cert_tracks(db, evt_tx).await,
        AppCommand::Audit => catalog::audit(db, evt_tx).await,
        AppCommand::Stats => catalog::stats(db, evt_tx).await,
        AppCommand::Help => {
            let _ = evt_tx.send(AppEvent::Message(USAGE.to_string()));
            Ok(())
        }
        AppCommand::Quit => {
            let _ = evt_tx.send(AppEvent::Message("收到退出命令".to_string()));
            Ok(())
        }
        AppCommand::Unknown(msg) if msg.is_empty() => Ok(()),
        AppCommand::Unknown(msg) => Err(anyhow::anyhow!(msg)),
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            report_error(&e, evt_tx);
            false
        }
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        cause
            .downcast_ref::<CatalogError>()
            .map_or(false, |ce| ce.is_not_found())
    })
}

/// Not-found is a warning that only aborts this command; everything else is an error.
fn report_error(e: &anyhow::Error, evt_tx: &mpsc::UnboundedSender<AppEvent>) {
    if is_not_found(e) {
        warn!("{:#}", e);
        let _ = evt_tx.send(AppEvent::Warn(format!("⚠ {:#}", e)));
    } else {
        error!("{:#}", e);
        let _ = evt_tx.send(AppEvent::Error(format!("✗ {:#}", e)));
    }
}
