use std::fmt::Display;
use std::sync::Arc;

use axum::{body::Bytes, response::Response, Extension};
use tracing::{info, instrument, warn};

use crate::api::rest::dto::{decode_request, IdRequest, RangeRequest};
use crate::api::rest::envelope;
use crate::api::rest::routes::ROUTES;
use crate::contract::model::Appointment;
use crate::domain::service::Service;

fn reject(route: &str, e: impl Display) -> Response {
    warn!(route, error = %e, "Rejected request before reaching the store");
    envelope::rejected()
}

/// Landing page listing the served routes.
pub async fn index() -> Response {
    info!("Index page requested");
    let paths: Vec<&str> = ROUTES.iter().map(|r| r.path).collect();
    envelope::html(format!(
        "<h1>Hello from AppointmentService</h1><br><h2>Available services: [{}]</h2>",
        paths.join(", ")
    ))
}

#[instrument(name = "appointments.rest.insert_appointment", skip_all)]
pub async fn insert_appointment(
    Extension(svc): Extension<Arc<Service>>,
    body: Bytes,
) -> Response {
    match Appointment::decode(&body) {
        Ok(appointment) => envelope::flag(svc.insert_appointment(appointment).await),
        Err(e) => reject("insertAppointment", e),
    }
}

#[instrument(name = "appointments.rest.update_appointment", skip_all)]
pub async fn update_appointment(
    Extension(svc): Extension<Arc<Service>>,
    body: Bytes,
) -> Response {
    match Appointment::decode(&body) {
        Ok(appointment) => envelope::flag(svc.replace_appointment(appointment).await),
        Err(e) => reject("updateAppointment", e),
    }
}

#[instrument(name = "appointments.rest.delete_appointment", skip_all)]
pub async fn delete_appointment(
    Extension(svc): Extension<Arc<Service>>,
    body: Bytes,
) -> Response {
    match decode_request::<IdRequest>(&body) {
        Ok(req) => envelope::flag(svc.delete_appointment(&req.id).await),
        Err(e) => reject("deleteAppointment", e),
    }
}

#[instrument(name = "appointments.rest.find_appointment", skip_all)]
pub async fn find_appointment(
    Extension(svc): Extension<Arc<Service>>,
    body: Bytes,
) -> Response {
    match decode_request::<IdRequest>(&body) {
        Ok(req) => envelope::single(svc.find_appointment(&req.id).await),
        Err(e) => reject("findAppointment", e),
    }
}

#[instrument(name = "appointments.rest.find_appointments_in_range", skip_all)]
pub async fn find_appointments_in_range(
    Extension(svc): Extension<Arc<Service>>,
    body: Bytes,
) -> Response {
    match decode_request::<RangeRequest>(&body) {
        Ok(req) => envelope::list(svc.find_appointments_in_range(req.start, req.end).await),
        Err(e) => reject("findAppointmentsInRange", e),
    }
}

#[instrument(name = "appointments.rest.all_appointments", skip_all)]
pub async fn all_appointments(Extension(svc): Extension<Arc<Service>>) -> Response {
    envelope::list(svc.all_appointments().await)
}

#[instrument(name = "appointments.rest.delete_all_appointments", skip_all)]
pub async fn delete_all_appointments(Extension(svc): Extension<Arc<Service>>) -> Response {
    envelope::delete_all(svc.delete_all_appointments().await)
}
