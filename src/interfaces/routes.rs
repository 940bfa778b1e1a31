use actix_web::web;

use crate::handlers::{
    home::home,
    media::upload_media,
    portfolio::{load_portfolio, save_portfolio},
};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);
    cfg.service(upload_media);
    cfg.service(save_portfolio);
    cfg.service(load_portfolio);
}
