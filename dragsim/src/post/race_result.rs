use helpers::general::{argsort, SortOrder};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum RaceEventKind {
    Jump,
    SpinOut,
    RedLightPenalty,
    Boost,
    Finish,
}

/// * `tick` - Simulation tick (counted from session creation) in which the event happened
/// * `time_s` - Race time in seconds, 0.0 before the start signal
/// * `vehicle` - Index of the vehicle, 0 for the player, 1 for the opponent
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RaceEvent {
    pub kind: RaceEventKind,
    pub tick: u64,
    pub time_s: f64,
    pub vehicle: usize,
}

/// VehicleSummary contains the per-vehicle information required for post-processing.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VehicleSummary {
    pub name: String,
    pub is_human: bool,
    pub race_time_s: Option<f64>,
    pub distance: f64,
    pub top_speed: f64,
    pub jumps: u32,
    pub spin_outs: u32,
    pub penalties: u32,
    pub boosts: u32,
    pub max_air_time: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    PlayerWins,
    OpponentWins,
    Tie,
    Undecided,
}

/// RaceResult contains all race information that is required for post-processing the results.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RaceResult {
    pub race_distance: f64,
    pub ticks: u64,
    pub vehicles: Vec<VehicleSummary>,
    pub events: Vec<RaceEvent>,
}

impl RaceResult {
    /// outcome compares the race times of player (index 0) and opponent (index 1). Equal times
    /// count as a tie, a missing time means the race is not decided yet.
    pub fn outcome(&self) -> Outcome {
        let times: Vec<Option<f64>> = self.vehicles.iter().map(|v| v.race_time_s).collect();

        match (times.first().copied().flatten(), times.get(1).copied().flatten()) {
            (Some(t_player), Some(t_opponent)) if t_player < t_opponent => Outcome::PlayerWins,
            (Some(t_player), Some(t_opponent)) if t_opponent < t_player => Outcome::OpponentWins,
            (Some(_), Some(_)) => Outcome::Tie,
            _ => Outcome::Undecided,
        }
    }

    /// standings returns the vehicle indices ordered by their race time. Vehicles that did not
    /// finish are ranked behind by their covered distance.
    pub fn standings(&self) -> Vec<usize> {
        let keys: Vec<f64> = self
            .vehicles
            .iter()
            .map(|v| match v.race_time_s {
                Some(t) => t,
                None => 1.0e9 - v.distance,
            })
            .collect();
        argsort(&keys, SortOrder::Ascending)
    }

    pub fn count_events(&self, vehicle: usize, kind: RaceEventKind) -> usize {
        self.events
            .iter()
            .filter(|e| e.vehicle == vehicle && e.kind == kind)
            .count()
    }

    /// print_race_times prints the standings and per-vehicle counters to the console output.
    pub fn print_race_times(&self) {
        let mut tmp_string = String::new();

        for (pos, &idx) in self.standings().iter().enumerate() {
            let v = &self.vehicles[idx];
            let time = match v.race_time_s {
                Some(t) => format!("{:8.3}s", t),
                None => String::from("     DNF"),
            };
            writeln!(
                &mut tmp_string,
                "{:2}. {:10} {}, top speed {:5.2}, jumps {}, spin-outs {}, penalties {}, boosts {}",
                pos + 1,
                v.name,
                time,
                v.top_speed,
                v.jumps,
                v.spin_outs,
                v.penalties,
                v.boosts
            )
            .unwrap();
        }

        println!("RESULT: Race times ({} units, {} ticks)", self.race_distance, self.ticks);
        println!("{}", tmp_string);
        println!("RESULT: {}", outcome_text(self.outcome()));
    }

    /// print_events prints the event log in chronological order.
    pub fn print_events(&self) {
        println!("RESULT: Events");
        for e in self.events.iter() {
            let name = self
                .vehicles
                .get(e.vehicle)
                .map(|v| v.name.as_str())
                .unwrap_or("?");
            println!("{:6} {:8.3}s {:10} {:?}", e.tick, e.time_s, name, e.kind);
        }
    }
}

pub fn outcome_text(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::PlayerWins => "YOU WIN!",
        Outcome::OpponentWins => "YOU LOSE!",
        Outcome::Tie => "IT'S A TIE!",
        Outcome::Undecided => "RACE NOT FINISHED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str, race_time_s: Option<f64>, distance: f64) -> VehicleSummary {
        VehicleSummary {
            name: name.to_owned(),
            is_human: false,
            race_time_s,
            distance,
            top_speed: 15.0,
            jumps: 0,
            spin_outs: 0,
            penalties: 0,
            boosts: 0,
            max_air_time: 0,
        }
    }

    fn result(a: Option<f64>, b: Option<f64>) -> RaceResult {
        RaceResult {
            race_distance: 6000.0,
            ticks: 100,
            vehicles: vec![summary("Player", a, 6000.0), summary("Opponent", b, 5000.0)],
            events: Vec::new(),
        }
    }

    #[test]
    fn outcome_compares_race_times() {
        assert_eq!(result(Some(10.0), Some(11.0)).outcome(), Outcome::PlayerWins);
        assert_eq!(result(Some(12.0), Some(11.0)).outcome(), Outcome::OpponentWins);
        assert_eq!(result(Some(11.0), Some(11.0)).outcome(), Outcome::Tie);
        assert_eq!(result(Some(11.0), None).outcome(), Outcome::Undecided);
    }

    #[test]
    fn unfinished_vehicles_are_ranked_last() {
        assert_eq!(result(None, Some(20.0)).standings(), vec![1, 0]);
        assert_eq!(result(Some(9.0), Some(20.0)).standings(), vec![0, 1]);
    }

    #[test]
    fn events_are_counted_per_vehicle() {
        let mut res = result(None, None);
        for (vehicle, kind) in [
            (0, RaceEventKind::Jump),
            (0, RaceEventKind::Jump),
            (1, RaceEventKind::Jump),
            (0, RaceEventKind::Boost),
        ] {
            res.events.push(RaceEvent {
                kind,
                tick: 1,
                time_s: 0.0,
                vehicle,
            });
        }
        assert_eq!(res.count_events(0, RaceEventKind::Jump), 2);
        assert_eq!(res.count_events(1, RaceEventKind::Jump), 1);
        assert_eq!(res.count_events(1, RaceEventKind::Boost), 0);
    }
}
