mod di;
mod routing;

use actix_web::{middleware, web::Data, App, HttpServer};
use common_actix::{define_app_error, get_address, init_logger};
use di::AppComponent;
use domain_schedule::usecases::ScheduleCache;

pub struct AppSchedule {
    schedule_cache: ScheduleCache,
}

define_app_error!(AppScheduleError);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logger();
    let app = Data::new(
        AppComponent::create_app()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{e:#}")))?,
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .app_data(app.clone())
            .service(routing::health)
            .service(routing::get_group_v1)
            .service(routing::get_week_v1)
            .service(routing::get_day_v1)
    })
    .bind(get_address())?
    .run()
    .await
}
