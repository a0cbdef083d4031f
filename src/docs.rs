use crate::api::calendar::{DayQuery, MonthQuery, MonthResponse};
use crate::api::leave_request::{HistoryQuery, TimeOffRequest, YearQuery};
use crate::api::schedule::{DayStatusUpdate, ShiftAssignment};
use crate::api::users::{AccrualRun, AuditQuery, BalanceAdjustment, RoleChange, UserListQuery};
use crate::engine::balances::AccrualSummary;
use crate::engine::calendar::{DayDetail, DaySummary};
use crate::engine::day_status::DayStatusOutcome;
use crate::engine::leave::HistoryPage;
use crate::model::leave_request::{LeaveRequest, LeaveType, RequestStatus};
use crate::model::role::Role;
use crate::model::shift::{ShiftKind, Squad};
use crate::model::status_entry::StatusLabel;
use crate::model::user::{NewUser, User};
use crate::models::{LoginReqDto, LoginResponse};
use crate::store::audit::AuditEvent;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Patrol Roster API",
        version = "1.0.0",
        description = r#"
## Patrol Roster

Shift calendar and leave management for a patrol unit.

### Key Features
- **Leave**
  - Sick leave is logged and debited at once
  - Vacation is requested, then approved or denied by an admin
- **Calendar**
  - Monthly and daily view of scheduled shifts, statuses and holidays
- **Administration**
  - Accounts, roles, balance corrections, day statuses and squad shifts

### Security
Every endpoint except `/auth/login` needs a **JWT Bearer** token.
Roles are ordered: user < admin < webmaster.

### Errors
Failures return `{"code": "...", "message": "..."}`.
"#,
    ),
    paths(
        crate::auth::handlers::login,

        crate::api::users::me,
        crate::api::users::list_users,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::set_role,
        crate::api::users::archive_user,
        crate::api::users::unarchive_user,
        crate::api::users::adjust_vacation,
        crate::api::users::adjust_sick,
        crate::api::users::audit_trail,
        crate::api::users::reset_sick_ytd,
        crate::api::users::run_accrual,

        crate::api::leave_request::request_time_off,
        crate::api::leave_request::my_requests,
        crate::api::leave_request::cancel_request,
        crate::api::leave_request::pending_requests,
        crate::api::leave_request::approve_request,
        crate::api::leave_request::deny_request,
        crate::api::leave_request::request_history,

        crate::api::calendar::month,
        crate::api::calendar::day,

        crate::api::schedule::set_day_status,
        crate::api::schedule::set_shift
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            User,
            NewUser,
            Role,
            Squad,
            ShiftKind,
            StatusLabel,
            LeaveType,
            RequestStatus,
            LeaveRequest,
            HistoryPage,
            TimeOffRequest,
            YearQuery,
            HistoryQuery,
            MonthQuery,
            DayQuery,
            MonthResponse,
            DaySummary,
            DayDetail,
            DayStatusUpdate,
            DayStatusOutcome,
            ShiftAssignment,
            UserListQuery,
            RoleChange,
            BalanceAdjustment,
            AuditQuery,
            AuditEvent,
            AccrualRun,
            AccrualSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login"),
        (name = "Users", description = "Accounts, roles and balances"),
        (name = "Leave", description = "Sick and vacation requests"),
        (name = "Calendar", description = "Shift and status calendar"),
        (name = "Schedule", description = "Squad shifts and day statuses"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/api/request-time-off",
            "/api/admin/requests/{request_id}/approve",
            "/api/calendar/{date}",
            "/api/admin/shifts",
            "/api/admin/vacation-accrual",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
