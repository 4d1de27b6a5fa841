//! Headless runner driving a [`SystemManager`].

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use outpost_core::data::Content;
use outpost_core::manager::{PlayerAction, SystemManager};
use outpost_core::offline::OfflineReport;
use outpost_core::snapshot::Snapshot;
use outpost_core::stations::{ResourceKind, UpgradeKey};

use crate::error::Result;
use crate::protocol::{Command, ResourceView, Response, StateView};

/// Engine plus the simulated clock it runs against.
///
/// The clock starts at the `now` passed to [`HeadlessRunner::load`] and
/// advances by each tick's length, so saved timestamps stay consistent
/// with simulated time.
pub struct HeadlessRunner {
    manager: SystemManager,
    now: DateTime<Utc>,
    tick: u64,
    autosaves: u64,
}

impl HeadlessRunner {
    /// Load a snapshot, run offline catch-up and build the engine.
    pub fn load(snapshot: &Snapshot, content: Content, now: DateTime<Utc>) -> (Self, OfflineReport) {
        let (manager, report) = SystemManager::load(snapshot, content, now);
        tracing::info!(
            minutes_passed = report.minutes_passed,
            gains = ?report.gains,
            "Headless runner ready"
        );
        let runner = Self {
            manager,
            now,
            tick: 0,
            autosaves: 0,
        };
        (runner, report)
    }

    /// The engine.
    pub fn manager(&self) -> &SystemManager {
        &self.manager
    }

    /// Simulated current time.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Autosave points crossed so far.
    pub fn autosaves(&self) -> u64 {
        self.autosaves
    }

    /// Run `count` ticks of the content's tick interval.
    pub fn simulate(&mut self, count: u64) {
        let dt_ms = self.manager.content().settings.tick_interval_ms;
        for _ in 0..count {
            self.step(dt_ms);
        }
        tracing::info!(ticks = self.tick, hash = self.manager.state_hash(), "Simulation finished");
    }

    /// The snapshot the persistence layer would store right now.
    pub fn save(&self) -> Snapshot {
        self.manager.save(self.now)
    }

    fn step(&mut self, dt_ms: u64) -> outpost_core::manager::TickReport {
        let report = self.manager.update(dt_ms);
        self.tick += 1;
        self.now += Duration::milliseconds(i64::try_from(dt_ms).unwrap_or(i64::MAX));
        if report.autosave_due {
            self.autosaves += 1;
            tracing::debug!(tick = self.tick, "Autosave point");
        }
        report
    }

    /// Handle one protocol command.
    pub fn handle(&mut self, command: Command) -> Response {
        let name = command.name();
        match command {
            Command::Tick { count, dt_ms } => {
                let dt_ms = dt_ms.unwrap_or(self.manager.content().settings.tick_interval_ms);
                let mut events = Vec::new();
                let mut autosave_due = false;
                for _ in 0..count {
                    let report = self.step(dt_ms);
                    autosave_due |= report.autosave_due;
                    events.extend(report.events);
                }
                Response::Ack {
                    cmd: name.to_string(),
                    accepted: true,
                    purchase: None,
                    autosave_due,
                    events,
                }
            }
            Command::Click { station } => self.act(name, PlayerAction::Click { station }),
            Command::Adjust { station, direction } => {
                self.act(name, PlayerAction::AdjustAutomation { station, direction })
            }
            Command::Purchase { key } => match UpgradeKey::from_str(&key) {
                Ok(key) => self.act(name, PlayerAction::Purchase { key }),
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::Preview { key } => {
                let cost = UpgradeKey::from_str(&key)
                    .ok()
                    .and_then(|parsed| self.manager.preview_cost(parsed));
                match cost {
                    Some(cost) => Response::Cost { key, cost },
                    None => Response::error(format!("Unknown upgrade key: {key}"), Some(name)),
                }
            }
            Command::StartEncounter { region, tier } => {
                self.act(name, PlayerAction::StartEncounter { region, tier })
            }
            Command::CombatAction { action } => {
                self.act(name, PlayerAction::CombatAction { action })
            }
            Command::Retreat => self.act(name, PlayerAction::Retreat),
            Command::Visit { page } => {
                self.manager.record_page_visit(&page, self.now);
                Response::ack(name, true, Vec::new())
            }
            Command::State => Response::State(self.state_view()),
            Command::Save => Response::Snapshot {
                snapshot: self.save(),
            },
            Command::Hash => Response::StateHash {
                tick: self.tick,
                hash: self.manager.state_hash(),
            },
            Command::Quit => Response::Bye,
        }
    }

    fn act(&mut self, name: &str, action: PlayerAction) -> Response {
        let report = self.manager.dispatch(action);
        Response::Ack {
            cmd: name.to_string(),
            accepted: report.accepted,
            purchase: report.purchase,
            autosave_due: false,
            events: report.events,
        }
    }

    /// Build the `state` response body.
    pub fn state_view(&self) -> StateView {
        let world = self.manager.world();
        let resources = ResourceKind::ALL
            .into_iter()
            .filter_map(|resource| {
                let storage = world.storage(resource)?;
                let generator = world.generator(resource.station());
                let view = ResourceView {
                    current: storage.current,
                    capacity: storage.capacity,
                    rate_per_second: generator.map_or(0.0, |g| g.rate_per_second()),
                    units: generator.map_or(0, |g| g.units),
                    active_units: generator.map_or(0, |g| g.active_units),
                };
                Some((resource, view))
            })
            .collect();

        let upgrades = UpgradeKey::all()
            .filter_map(|key| {
                let level = world.upgrade_levels(key.station)?.level(key.kind);
                (level > 0).then(|| (key.to_string(), level))
            })
            .collect::<BTreeMap<_, _>>();

        StateView {
            tick: self.tick,
            resources,
            upgrades,
            unlocked_logs: world.logs.unlocked_ids(),
            combat: self.manager.combat().clone(),
            hash: self.manager.state_hash(),
        }
    }

    /// Serve the JSON-lines protocol until `quit` or end of input.
    ///
    /// Malformed lines are answered with an error response and skipped.
    pub fn serve<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut output: W,
        offline: &OfflineReport,
    ) -> Result<()> {
        write_line(
            &mut output,
            &Response::ready(offline.minutes_passed, offline.gains.clone()),
        )?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match Command::from_json(line) {
                Ok(Command::Quit) => break,
                Ok(command) => {
                    tracing::debug!(cmd = command.name(), "Command received");
                    self.handle(command)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed command");
                    Response::error(format!("Parse error: {e}"), None)
                }
            };
            write_line(&mut output, &response)?;
        }

        write_line(&mut output, &Response::Bye)?;
        tracing::info!(ticks = self.tick, "Session ended");
        Ok(())
    }
}

fn write_line<W: Write>(output: &mut W, response: &Response) -> Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()?;
    Ok(())
}
