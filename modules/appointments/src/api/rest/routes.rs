use axum::routing::{delete, get, post, put, MethodRouter};
use axum::{Extension, Router};
use std::sync::Arc;

use crate::api::rest::handlers;
use crate::domain::service::Service;

/// A served route, as listed on the index page.
#[derive(Debug, Clone, Copy)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
}

pub const ROUTES: &[RouteInfo] = &[
    RouteInfo { method: "GET", path: "/" },
    RouteInfo { method: "DELETE", path: "/rest/deleteAppointment" },
    RouteInfo { method: "POST", path: "/rest/insertAppointment" },
    RouteInfo { method: "PUT", path: "/rest/updateAppointment" },
    RouteInfo { method: "GET", path: "/rest/findAppointment" },
    RouteInfo { method: "GET", path: "/rest/findAppointmentsInRange" },
    RouteInfo { method: "GET", path: "/rest/allAppointments/" },
    RouteInfo { method: "GET", path: "/rest/deleteAllAppointments/" },
];

pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    let all: MethodRouter = get(handlers::all_appointments);
    let delete_all: MethodRouter = get(handlers::delete_all_appointments);

    router
        .route("/", get(handlers::index))
        .route("/rest/deleteAppointment", delete(handlers::delete_appointment))
        .route("/rest/insertAppointment", post(handlers::insert_appointment))
        .route("/rest/updateAppointment", put(handlers::update_appointment))
        .route("/rest/findAppointment", get(handlers::find_appointment))
        .route(
            "/rest/findAppointmentsInRange",
            get(handlers::find_appointments_in_range),
        )
        // both slash forms are served
        .route("/rest/allAppointments", all.clone())
        .route("/rest/allAppointments/", all)
        .route("/rest/deleteAllAppointments", delete_all.clone())
        .route("/rest/deleteAllAppointments/", delete_all)
        .layer(Extension(service))
}
