//! Local draw simulation over the in-memory transport.

use fairdraw_commit_reveal::random_nonce;
use fairdraw_crypto::{generate_keypair, random_bytes};
use fairdraw_draw::{CandidateSummary, Stakeholder};
use fairdraw_nullables::{NullCommunicator, NullHub};
use fairdraw_service::{DrawService, DrawSession, ServiceConfig, ServiceError};
use fairdraw_types::{DrawStatus, UserId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const SIMULATION_DEADLINE: Duration = Duration::from_secs(30);

pub struct Outcome {
    pub uuid: String,
    pub status: DrawStatus,
    pub winner: Option<UserId>,
    pub offenders: Vec<UserId>,
    pub summaries: Vec<CandidateSummary>,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "draw {}: {}", self.uuid, self.status)?;
        for summary in &self.summaries {
            let value = summary
                .signed_reveal
                .as_ref()
                .map(|r| r.reveal.data.as_str())
                .unwrap_or("-");
            let marker = if summary.winner { " (winner)" } else { "" };
            writeln!(f, "  {} value={} {:?}{}", summary.candidate.id(), value, summary.status, marker)?;
        }
        match &self.winner {
            Some(winner) => write!(f, "winner: {winner}"),
            None if self.offenders.is_empty() => write!(f, "no winner"),
            None => {
                let blamed: Vec<String> = self.offenders.iter().map(UserId::to_string).collect();
                write!(f, "no winner, blamed: {}", blamed.join(", "))
            }
        }
    }
}

/// Run a draw with `spots` local peers and report what the first peer saw.
pub async fn run(config: ServiceConfig, spots: usize, cheat: bool) -> anyhow::Result<Outcome> {
    let hub = NullHub::new();
    let mut peers = Vec::with_capacity(spots);
    for i in 0..spots {
        let service = DrawService::new(
            Arc::new(hub.communicator()),
            Stakeholder::new(format!("peer-{i}")),
            generate_keypair()?,
            config.clone(),
        );
        service.open().await?;
        peers.push(service);
    }

    let Some(host) = peers.first() else {
        anyhow::bail!("no peers to run the draw");
    };
    let draw = host.create_draw(spots, None).await?;
    let uuid = draw.uuid().to_string();
    info!(draw = %uuid, spots, cheat, "simulation started");

    let draw_uuid = uuid.as_str();
    let runs = peers.iter().enumerate().map(|(i, service)| {
        let cheater = cheat && i + 1 == spots;
        participate(service, draw_uuid, cheater)
    });
    let sessions = tokio::time::timeout(SIMULATION_DEADLINE, futures::future::try_join_all(runs))
        .await
        .map_err(|_| anyhow::anyhow!("draw did not settle within {}s", SIMULATION_DEADLINE.as_secs()))??;

    let Some(view) = sessions.first() else {
        anyhow::bail!("no session to report from");
    };
    let draw = view.draw();
    Ok(Outcome {
        uuid,
        status: draw.status(),
        winner: draw.winner().map(|w| w.id().clone()),
        offenders: draw.offenders(),
        summaries: view.summaries(),
    })
}

async fn participate(
    service: &DrawService<NullCommunicator>,
    uuid: &str,
    cheater: bool,
) -> Result<DrawSession<NullCommunicator>, ServiceError> {
    let value = u32::from_le_bytes(random_bytes::<4>()?).to_string();
    let nonce = random_nonce()?;

    service.join_draw(uuid).await?;
    let mut session = service.watch_draw(uuid).await?;

    if session.run_until(DrawStatus::Commit).await? != DrawStatus::Commit {
        return Ok(session);
    }
    session.commit(&value, &nonce, None).await?;

    if session.run_until(DrawStatus::Reveal).await? != DrawStatus::Reveal {
        return Ok(session);
    }
    let revealed_nonce = if cheater { format!("{nonce}-altered") } else { nonce };
    session.reveal(&value, &revealed_nonce, None).await?;

    session.run_until_terminal().await?;
    Ok(session)
}
