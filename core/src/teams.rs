//! Balanced team generation.
//!
//! Confirmed parties are flattened into one player pool (registrants plus
//! their guests), shuffled uniformly, and dealt round-robin. The deal makes
//! balance structural: team sizes can never differ by more than one, and
//! every pooled player lands on exactly one team. Teams are ephemeral and
//! recomputed on request; nothing here mutates the roster.

use crate::types::{RegistrationStatus, Roster, Team};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Minimum pool size that can be split into teams.
pub const MIN_PLAYERS: usize = 2;
/// Lower bound on the number of teams.
const MIN_TEAMS: usize = 2;
/// Pools up to this size default to a simple two-team split.
const TWO_TEAM_LIMIT: usize = 10;
/// Larger pools aim for teams of roughly this size.
const TARGET_TEAM_SIZE: usize = 3;

/// Failure modes of team generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamsError {
    /// The confirmed pool cannot form two teams.
    #[error("need at least 2 players to form teams, have {available}")]
    InsufficientPlayers {
        /// Players available in the confirmed pool.
        available: usize,
    },
}

/// Flattens confirmed registrations into display names, roster order.
fn player_pool(roster: &Roster) -> Vec<String> {
    let mut pool = Vec::new();
    for entry in roster.with_status(RegistrationStatus::Confirmed) {
        pool.push(entry.name.to_string());
        pool.extend(entry.active_guests().map(str::to_string));
    }
    pool
}

/// Picks the team count: the caller's request when given, otherwise two
/// teams for a casual-sized pool and roughly three-player teams beyond
/// that. Always clamped so every team gets at least one player.
fn resolved_team_count(requested: Option<usize>, pool_size: usize) -> usize {
    let default = if pool_size <= TWO_TEAM_LIMIT {
        MIN_TEAMS
    } else {
        pool_size.div_ceil(TARGET_TEAM_SIZE)
    };
    requested.unwrap_or(default).clamp(MIN_TEAMS, pool_size)
}

/// Splits the confirmed roster into balanced teams.
///
/// The pool is shuffled with the caller's RNG, so a seeded `StdRng` makes
/// the deal reproducible and an entropy-seeded one makes it fair. Fails
/// with [`TeamsError::InsufficientPlayers`] when fewer than two players
/// are confirmed; the roster is never modified either way.
pub fn partition<R: Rng + ?Sized>(
    roster: &Roster,
    team_count: Option<usize>,
    rng: &mut R,
) -> Result<Vec<Team>, TeamsError> {
    let mut pool = player_pool(roster);
    if pool.len() < MIN_PLAYERS {
        return Err(TeamsError::InsufficientPlayers {
            available: pool.len(),
        });
    }

    let teams = resolved_team_count(team_count, pool.len());
    let players = pool.len();
    pool.shuffle(rng);

    let mut dealt: Vec<Vec<String>> = vec![Vec::new(); teams];
    for (i, player) in pool.into_iter().enumerate() {
        dealt[i % teams].push(player);
    }

    tracing::debug!(players, teams, "dealt balanced teams");
    Ok(dealt.into_iter().map(Team::new).collect())
}
