//! Presentation model for tournament brackets. The server computes pairings
//! and standings; this only groups and labels what it sent.

use crate::{BracketSide, Match, Team, Tournament, TournamentFormat};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    Fr,
    En,
}

impl Locale {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fr" | "fr_fr" | "fr-fr" => Some(Locale::Fr),
            "en" | "en_us" | "en-us" | "en_gb" | "en-gb" => Some(Locale::En),
            _ => None,
        }
    }
}

/// Name of a round, by its distance from the final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundName {
    Final,
    Semifinal,
    Quarterfinal,
    FirstRound,
    Numbered(u32),
}

impl RoundName {
    /// Direct arithmetic mapping; checked in this order so short brackets
    /// (total < 4) name their last rounds first.
    pub fn for_round(round: u32, total: u32) -> Self {
        if round == total {
            RoundName::Final
        } else if total.checked_sub(1) == Some(round) {
            RoundName::Semifinal
        } else if total.checked_sub(2) == Some(round) {
            RoundName::Quarterfinal
        } else if round == 1 {
            RoundName::FirstRound
        } else {
            RoundName::Numbered(round)
        }
    }

    pub fn label(&self, locale: Locale) -> String {
        match (self, locale) {
            (RoundName::Final, Locale::Fr) => "Finale".to_string(),
            (RoundName::Semifinal, Locale::Fr) => "Demi-finale".to_string(),
            (RoundName::Quarterfinal, Locale::Fr) => "Quart de finale".to_string(),
            (RoundName::FirstRound, Locale::Fr) => "Premier tour".to_string(),
            (RoundName::Numbered(n), Locale::Fr) => format!("Tour {n}"),
            (RoundName::Final, Locale::En) => "Final".to_string(),
            (RoundName::Semifinal, Locale::En) => "Semifinal".to_string(),
            (RoundName::Quarterfinal, Locale::En) => "Quarterfinal".to_string(),
            (RoundName::FirstRound, Locale::En) => "First round".to_string(),
            (RoundName::Numbered(n), Locale::En) => format!("Round {n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketRound<'a> {
    pub number: u32,
    pub name: RoundName,
    pub matches: Vec<&'a Match>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BracketView<'a> {
    /// Round robin: standings plus every fixture, by round.
    RoundRobin {
        standings: Vec<&'a Team>,
        rounds: Vec<BracketRound<'a>>,
    },
    /// Swiss: standings plus the pairings of each round.
    Swiss {
        standings: Vec<&'a Team>,
        rounds: Vec<BracketRound<'a>>,
    },
    /// Single or double elimination. `losers` is empty for single elimination.
    Elimination {
        winners: Vec<BracketRound<'a>>,
        losers: Vec<BracketRound<'a>>,
    },
}

impl<'a> BracketView<'a> {
    pub fn build(tournament: &'a Tournament) -> Self {
        match tournament.format {
            TournamentFormat::RoundRobin => BracketView::RoundRobin {
                standings: standings(&tournament.teams),
                rounds: group_numbered(tournament.matches.iter()),
            },
            TournamentFormat::Swiss => BracketView::Swiss {
                standings: standings(&tournament.teams),
                rounds: group_numbered(tournament.matches.iter()),
            },
            TournamentFormat::SingleElimination | TournamentFormat::DoubleElimination => {
                let winners: Vec<&Match> = tournament
                    .matches
                    .iter()
                    .filter(|m| m.bracket == BracketSide::Winners)
                    .collect();
                let losers = tournament
                    .matches
                    .iter()
                    .filter(|m| m.bracket == BracketSide::Losers);
                let total = tournament
                    .rounds_total
                    .or_else(|| winners.iter().map(|m| m.round).max())
                    .unwrap_or(0);
                BracketView::Elimination {
                    winners: group_named(winners.into_iter(), total),
                    losers: group_numbered(losers),
                }
            }
        }
    }

    /// Every round, in display order (winners side first).
    pub fn rounds(&self) -> Vec<&BracketRound<'a>> {
        match self {
            BracketView::RoundRobin { rounds, .. } | BracketView::Swiss { rounds, .. } => {
                rounds.iter().collect()
            }
            BracketView::Elimination { winners, losers } => {
                winners.iter().chain(losers.iter()).collect()
            }
        }
    }

    pub fn standings(&self) -> Option<&[&'a Team]> {
        match self {
            BracketView::RoundRobin { standings, .. } | BracketView::Swiss { standings, .. } => {
                Some(standings)
            }
            BracketView::Elimination { .. } => None,
        }
    }
}

/// Teams in the order the server sent them. The server ranks by `position`;
/// re-sorting here would hide its tie-breaks.
pub fn standings(teams: &[Team]) -> Vec<&Team> {
    teams.iter().collect()
}

fn group_by_round<'a>(matches: impl Iterator<Item = &'a Match>) -> BTreeMap<u32, Vec<&'a Match>> {
    let mut rounds: BTreeMap<u32, Vec<&Match>> = BTreeMap::new();
    for m in matches {
        rounds.entry(m.round).or_default().push(m);
    }
    rounds
}

fn group_named<'a>(matches: impl Iterator<Item = &'a Match>, total: u32) -> Vec<BracketRound<'a>> {
    group_by_round(matches)
        .into_iter()
        .map(|(number, matches)| BracketRound {
            number,
            name: RoundName::for_round(number, total),
            matches,
        })
        .collect()
}

fn group_numbered<'a>(matches: impl Iterator<Item = &'a Match>) -> Vec<BracketRound<'a>> {
    group_by_round(matches)
        .into_iter()
        .map(|(number, matches)| BracketRound {
            number,
            name: RoundName::Numbered(number),
            matches,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(id: u64, round: u32) -> Match {
        Match { id, round, ..Default::default() }
    }

    fn team(id: u64, position: u32) -> Team {
        Team {
            id,
            name: format!("team{id}"),
            captain_id: id * 10,
            position: Some(position),
            ..Default::default()
        }
    }

    #[test]
    fn round_names_in_french() {
        let total = 4;
        let labels: Vec<String> = (1..=total)
            .rev()
            .map(|r| RoundName::for_round(r, total).label(Locale::Fr))
            .collect();
        assert_eq!(labels, ["Finale", "Demi-finale", "Quart de finale", "Premier tour"]);
    }

    #[test]
    fn round_names_in_english() {
        assert_eq!(RoundName::for_round(6, 6).label(Locale::En), "Final");
        assert_eq!(RoundName::for_round(5, 6).label(Locale::En), "Semifinal");
        assert_eq!(RoundName::for_round(4, 6).label(Locale::En), "Quarterfinal");
        assert_eq!(RoundName::for_round(3, 6).label(Locale::En), "Round 3");
        assert_eq!(RoundName::for_round(2, 6).label(Locale::En), "Round 2");
        assert_eq!(RoundName::for_round(1, 6).label(Locale::En), "First round");
    }

    #[test]
    fn short_brackets_prefer_names_closest_to_final() {
        assert_eq!(RoundName::for_round(1, 1), RoundName::Final);
        assert_eq!(RoundName::for_round(1, 2), RoundName::Semifinal);
        assert_eq!(RoundName::for_round(1, 3), RoundName::Quarterfinal);
    }

    #[test]
    fn locale_parse() {
        assert_eq!(Locale::parse("EN"), Some(Locale::En));
        assert_eq!(Locale::parse("fr-FR"), Some(Locale::Fr));
        assert_eq!(Locale::parse("de"), None);
    }

    #[test]
    fn elimination_groups_rounds_ascending() {
        let t = Tournament {
            format: TournamentFormat::SingleElimination,
            matches: vec![m(7, 3), m(1, 1), m(5, 2), m(2, 1), m(3, 1), m(6, 2), m(4, 1)],
            ..Default::default()
        };
        let view = BracketView::build(&t);
        let BracketView::Elimination { winners, losers } = &view else {
            panic!("expected elimination view");
        };
        assert!(losers.is_empty());
        let numbers: Vec<u32> = winners.iter().map(|r| r.number).collect();
        assert_eq!(numbers, [1, 2, 3]);
        assert_eq!(winners[0].matches.len(), 4);
        assert_eq!(winners[2].name, RoundName::Final);
        assert_eq!(winners[1].name, RoundName::Semifinal);
        // Three rounds: round 1 sits at total - 2.
        assert_eq!(winners[0].name, RoundName::Quarterfinal);
    }

    #[test]
    fn rounds_total_from_server_overrides_observed_rounds() {
        let t = Tournament {
            format: TournamentFormat::SingleElimination,
            rounds_total: Some(4),
            matches: vec![m(1, 1), m(2, 1)],
            ..Default::default()
        };
        let view = BracketView::build(&t);
        assert_eq!(view.rounds()[0].name, RoundName::FirstRound);
    }

    #[test]
    fn double_elimination_splits_losers_side() {
        let mut loser = m(9, 1);
        loser.bracket = BracketSide::Losers;
        let t = Tournament {
            format: TournamentFormat::DoubleElimination,
            matches: vec![m(1, 1), m(2, 1), m(3, 2), loser],
            ..Default::default()
        };
        let BracketView::Elimination { winners, losers } = BracketView::build(&t) else {
            panic!("expected elimination view");
        };
        assert_eq!(winners.len(), 2);
        assert_eq!(losers.len(), 1);
        assert_eq!(losers[0].name, RoundName::Numbered(1));
        assert_eq!(winners[1].name, RoundName::Final);
    }

    #[test]
    fn round_robin_standings_keep_server_order() {
        let teams = vec![team(1, 1), team(2, 2), team(3, 3)];
        let t = Tournament {
            format: TournamentFormat::RoundRobin,
            teams: teams.clone(),
            ..Default::default()
        };
        let ids: Vec<u64> = BracketView::build(&t)
            .standings()
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, [1, 2, 3]);

        let reversed = Tournament {
            format: TournamentFormat::RoundRobin,
            teams: teams.into_iter().rev().collect(),
            ..Default::default()
        };
        let ids: Vec<u64> = BracketView::build(&reversed)
            .standings()
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, [3, 2, 1]);
    }

    #[test]
    fn round_robin_fixtures_are_grouped_by_round() {
        let t = Tournament {
            format: TournamentFormat::RoundRobin,
            teams: vec![team(1, 1), team(2, 2), team(3, 3)],
            matches: vec![m(3, 2), m(1, 1), m(2, 1)],
            ..Default::default()
        };
        let view = BracketView::build(&t);
        let rounds = view.rounds();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].matches.iter().map(|m| m.id).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(rounds[1].name, RoundName::Numbered(2));
        assert_eq!(view.standings().map(|s| s.len()), Some(3));
    }

    #[test]
    fn round_numbers_near_u32_max_do_not_overflow() {
        assert_eq!(RoundName::for_round(u32::MAX, 4), RoundName::Numbered(u32::MAX));
        assert_eq!(RoundName::for_round(u32::MAX - 1, u32::MAX), RoundName::Semifinal);
        assert_eq!(RoundName::for_round(3, 0), RoundName::Numbered(3));
    }

    #[test]
    fn swiss_rounds_are_numbered() {
        let t = Tournament {
            format: TournamentFormat::Swiss,
            teams: vec![team(1, 1), team(2, 2)],
            matches: vec![m(1, 2), m(2, 1)],
            ..Default::default()
        };
        let view = BracketView::build(&t);
        let names: Vec<RoundName> = view.rounds().iter().map(|r| r.name).collect();
        assert_eq!(names, [RoundName::Numbered(1), RoundName::Numbered(2)]);
        assert_eq!(view.standings().map(|s| s.len()), Some(2));
    }
}
