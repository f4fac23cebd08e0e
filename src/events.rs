use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::settlement::same_team;

static EXTRA_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\+(\d+)'").expect("extra time pattern"));
static MINUTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)'").expect("minute pattern"));
static TEAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("team pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Yellow,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Goal {
    pub team: String,
    pub player: String,
    pub minute: u32,
    pub extra_time: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub team: String,
    pub player: String,
    pub minute: u32,
    pub extra_time: Option<u32>,
    pub kind: CardKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Substitution {
    pub team: String,
    pub minute: u32,
    pub extra_time: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimelineEvent {
    Goal(Goal),
    Card(Card),
    Substitution(Substitution),
}

impl TimelineEvent {
    pub fn team(&self) -> &str {
        match self {
            TimelineEvent::Goal(g) => &g.team,
            TimelineEvent::Card(c) => &c.team,
            TimelineEvent::Substitution(s) => &s.team,
        }
    }
}

pub fn parse_timeline<S: AsRef<str>>(lines: &[S]) -> Vec<TimelineEvent> {
    lines
        .iter()
        .filter_map(|line| parse_event_line(line.as_ref()))
        .collect()
}

pub fn parse_event_line(line: &str) -> Option<TimelineEvent> {
    let line = line.trim();
    let lowered = line.to_ascii_lowercase();

    enum Kind {
        Goal,
        Card(CardKind),
        Sub,
    }
    let kind = if lowered.contains("red card") || lowered.contains("second yellow") {
        Kind::Card(CardKind::Red)
    } else if lowered.contains("yellow card") {
        Kind::Card(CardKind::Yellow)
    } else if lowered.contains("goal") {
        Kind::Goal
    } else if lowered.contains("substitution") || lowered.contains("subst") {
        Kind::Sub
    } else {
        return None;
    };

    let (minute, extra_time) = leading_clock(line)?;
    let team = TEAM_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())?;

    Some(match kind {
        Kind::Goal => TimelineEvent::Goal(Goal {
            player: team.clone(),
            team,
            minute,
            extra_time,
        }),
        Kind::Card(kind) => TimelineEvent::Card(Card {
            player: team.clone(),
            team,
            minute,
            extra_time,
            kind,
        }),
        Kind::Sub => TimelineEvent::Substitution(Substitution {
            team,
            minute,
            extra_time,
        }),
    })
}

fn leading_clock(line: &str) -> Option<(u32, Option<u32>)> {
    if let Some(caps) = EXTRA_TIME_RE.captures(line) {
        let minute = caps.get(1)?.as_str().parse().ok()?;
        let extra = caps.get(2)?.as_str().parse().ok()?;
        return Some((minute, Some(extra)));
    }
    let caps = MINUTE_RE.captures(line)?;
    Some((caps.get(1)?.as_str().parse().ok()?, None))
}

/// Goals per side. Goals credited to neither side are ignored.
pub fn goal_tally(events: &[TimelineEvent], home: &str, away: &str) -> (i32, i32) {
    let mut tally = (0, 0);
    for event in events {
        let TimelineEvent::Goal(goal) = event else {
            continue;
        };
        if names_side(&goal.team, home) {
            tally.0 += 1;
        } else if names_side(&goal.team, away) {
            tally.1 += 1;
        }
    }
    tally
}

fn names_side(team: &str, side: &str) -> bool {
    same_team(team, side) || same_team(side, team)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_time_minute() {
        let Some(TimelineEvent::Card(card)) = parse_event_line("45+2' - Yellow Card - (Everton) -")
        else {
            panic!("expected card");
        };
        assert_eq!(card.minute, 45);
        assert_eq!(card.extra_time, Some(2));
        assert_eq!(card.kind, CardKind::Yellow);
        assert_eq!(card.player, "Everton");
    }

    #[test]
    fn missing_minute_or_team_is_dropped() {
        assert!(parse_event_line("1st Goal - (Everton) -").is_none());
        assert!(parse_event_line("12' - Goal - Everton -").is_none());
        assert!(parse_event_line("12' - Kick off").is_none());
    }
}
