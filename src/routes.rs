use crate::{
    api::{attendance, employee, leave_request, payroll, settings},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            tracing::warn!(requests_per_min, "Invalid rate limit, using governor defaults");
            GovernorConfig::default()
        });
    Governor::new(&cfg)
}

/// Registers every API resource under `config.api_prefix`, rate limited per peer IP.
/// Authentication happens in the `AuthUser` extractor of each handler.
pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(build_limiter(config.rate_protected_per_min))
            .service(
                web::scope("/employee")
                    // /employee
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employee/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(employee::set_employee_status)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    .service(
                        web::resource("/appeals/pending-count")
                            .route(web::get().to(leave_request::pending_appeal_count)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    .service(
                        web::resource("/{id}/supervisor-decision")
                            .route(web::put().to(leave_request::supervisor_decision)),
                    )
                    .service(
                        web::resource("/{id}/admin-decision")
                            .route(web::put().to(leave_request::admin_decision)),
                    )
                    .service(
                        web::resource("/{id}/appeal")
                            .route(web::post().to(leave_request::appeal_leave)),
                    )
                    .service(
                        web::resource("/{id}/appeal/review")
                            .route(web::put().to(leave_request::review_appeal)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
                    .service(web::resource("/check-out").route(web::post().to(attendance::check_out)))
                    .service(web::resource("/manual").route(web::put().to(attendance::manual_entry)))
                    .service(web::resource("/facts").route(web::get().to(attendance::monthly_facts))),
            )
            .service(
                web::scope("/payroll")
                    // /payroll
                    .service(web::resource("").route(web::get().to(payroll::list_payrolls)))
                    // static segments before /payroll/{id}
                    .service(web::resource("/generate").route(web::post().to(payroll::generate_payroll)))
                    .service(web::resource("/decision").route(web::put().to(payroll::bulk_decide)))
                    .service(web::resource("/pay").route(web::put().to(payroll::mark_paid)))
                    .service(web::resource("/{id}").route(web::get().to(payroll::get_payroll)))
                    .service(web::resource("/{id}/field").route(web::put().to(payroll::update_field))),
            )
            .service(
                web::resource("/settings")
                    .route(web::get().to(settings::get_settings))
                    .route(web::put().to(settings::update_setting)),
            ),
    );
}
