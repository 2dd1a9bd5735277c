use actix_web::{web, HttpResponse};
use tickler_api_structs::{get_service_health::*, Envelope};
use tickler_infra::TicklerContext;

async fn status(ctx: web::Data<TicklerContext>) -> HttpResponse {
    HttpResponse::Ok().json(Envelope::ok(APIResponse {
        message: "Yo! We are up!\r\n".into(),
        server_time: ctx.sys.get_timestamp_millis(),
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(status));
}
