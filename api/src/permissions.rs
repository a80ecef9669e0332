//! Capability sets derived from (current user, entity, state).
//!
//! Everything here is advisory: the backend authorizes every mutating call on
//! its own. These gates decide which actions the UI offers and are recomputed
//! on every draw.

use crate::{
    Event, Match, MatchState, MemberRole, MembershipPolicy, Organization, SignupStatus,
    Tournament, TournamentState, User,
};
use chrono::{DateTime, Utc};

/// Minimum number of registered teams before a tournament can start.
pub const MIN_TEAMS_TO_START: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCapabilities {
    pub report_score: bool,
    pub dispute: bool,
    pub verify: bool,
    pub schedule: bool,
    pub upload_attachment: bool,
}

impl MatchCapabilities {
    pub fn any(&self) -> bool {
        self.report_score || self.dispute || self.verify || self.schedule
    }
}

pub fn match_capabilities(
    user: Option<&User>,
    m: &Match,
    tournament_state: TournamentState,
) -> MatchCapabilities {
    let Some(user) = user else {
        return MatchCapabilities::default();
    };
    if tournament_state != TournamentState::Ongoing {
        return MatchCapabilities::default();
    }

    let captain = m.is_captain(user.id);
    let report_score = m.state == MatchState::Pending && (captain || m.can_report);
    let dispute = matches!(m.state, MatchState::Reported | MatchState::Verified) && captain;
    let verify = m.state == MatchState::Reported && m.can_verify;
    let schedule = m.state == MatchState::Pending && m.scheduled_at.is_none() && captain;

    MatchCapabilities {
        report_score,
        dispute,
        verify,
        schedule,
        upload_attachment: report_score || verify,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TournamentCapabilities {
    pub manage: bool,
    pub open_registration: bool,
    pub close_registration: bool,
    pub reopen_registration: bool,
    pub start: bool,
    pub cancel: bool,
    pub register_team: bool,
}

pub fn tournament_capabilities(user: Option<&User>, t: &Tournament) -> TournamentCapabilities {
    let Some(user) = user else {
        return TournamentCapabilities::default();
    };

    let manage = t.can_manage || user.is_admin() || t.created_by == user.id;
    let state = t.state;
    let has_room = t
        .max_teams
        .is_none_or(|max| t.team_count() < max as usize);

    let allowed = |next: TournamentState| manage && state.can_transition_to(next);

    TournamentCapabilities {
        manage,
        open_registration: state == TournamentState::Draft
            && allowed(TournamentState::OpenRegistration),
        close_registration: allowed(TournamentState::RegistrationClosed),
        reopen_registration: state == TournamentState::RegistrationClosed
            && allowed(TournamentState::OpenRegistration),
        start: allowed(TournamentState::Ongoing) && t.team_count() >= MIN_TEAMS_TO_START,
        cancel: allowed(TournamentState::Cancelled),
        register_team: state == TournamentState::OpenRegistration
            && t.team_of(user.id).is_none()
            && has_room,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrganizationCapabilities {
    pub join: bool,
    pub request_join: bool,
    pub leave: bool,
    pub manage_members: bool,
    pub review_requests: bool,
    pub edit: bool,
}

pub fn organization_capabilities(user: Option<&User>, org: &Organization) -> OrganizationCapabilities {
    let Some(user) = user else {
        return OrganizationCapabilities::default();
    };

    let owner = org.owner_id == user.id;
    let member = org.my_role.is_some() || owner;
    let staff = owner || org.my_role >= Some(MemberRole::Moderator);

    OrganizationCapabilities {
        join: !member && org.membership_policy == MembershipPolicy::Open,
        request_join: !member
            && org.membership_policy == MembershipPolicy::RequestOnly
            && !org.has_pending_request,
        leave: member && !owner,
        manage_members: staff,
        review_requests: staff,
        edit: owner || org.my_role == Some(MemberRole::Admin),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCapabilities {
    pub sign_up: bool,
    pub withdraw: bool,
    pub check_in: bool,
    pub edit: bool,
}

pub fn event_capabilities(user: Option<&User>, event: &Event, now: DateTime<Utc>) -> EventCapabilities {
    let Some(user) = user else {
        return EventCapabilities::default();
    };

    let signup = event.active_signup(user.id);
    let started = now >= event.starts_at;
    let checkin_open = event
        .checkin_opens_at
        .is_some_and(|opens| opens <= now && now < event.ends_at());

    EventCapabilities {
        sign_up: signup.is_none() && !started,
        withdraw: signup.is_some() && !started,
        check_in: checkin_open && signup.is_some_and(|s| s.status == SignupStatus::Confirmed),
        edit: event.created_by == user.id || user.is_admin(),
    }
}
