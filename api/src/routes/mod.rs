//! Add top-level routes as submodules here.

use crate::{error, state::RocketState};
use rocket::{catchers, Build, Rocket};
use rocket_okapi::{
    openapi_get_routes,
    swagger_ui::{make_swagger_ui, DefaultModelRendering, SwaggerUIConfig},
};

mod auth;
mod content;
mod payments;
mod subscription;
mod user;

const BASE: &str = "/api";

pub fn register(rocket: Rocket<Build>, state: RocketState) -> Rocket<Build> {
    let rocket = rocket.manage(state);
    let rocket = rocket
        .mount(
            BASE,
            openapi_get_routes![
                auth::register,
                auth::login,
                user::get,
                payments::create,
                payments::check,
                subscription::get,
                content::generate,
            ],
        )
        .register("/", catchers![error::default_catcher]);
    mount_swagger(rocket)
}

pub fn mount_swagger(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount(
        format!("{}/swagger", BASE),
        make_swagger_ui(&SwaggerUIConfig {
            url: "../openapi.json".to_owned(),
            default_model_rendering: DefaultModelRendering::Model,
            show_extensions: true,
            ..Default::default()
        }),
    )
}
