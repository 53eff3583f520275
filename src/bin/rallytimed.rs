use actix_web::{web, App, HttpResponse, HttpServer};
use serde::Deserialize;
use tracing::info;

use rallytiming::models::{CaptureDto, CaptureUpdate, CaptureView, NewCapture, PenaltyRequest};
use rallytiming::store::PgStore;
use rallytiming::{connect_service, init_tracing, ClassificationScope, Config, TimingError, TimingService};

type Service = web::Data<TimingService<PgStore>>;

/// Runs a blocking service call on the actix worker pool.
async fn run<T, F>(service: &Service, f: F) -> actix_web::Result<T>
where
    F: FnOnce(&TimingService<PgStore>) -> Result<T, TimingError> + Send + 'static,
    T: Send + 'static,
{
    let service = service.clone();
    let result = web::block(move || f(service.get_ref())).await?;
    Ok(result?)
}

fn dtos(views: &[CaptureView]) -> Vec<CaptureDto> {
    views.iter().map(|v| CaptureDto::from(&v.capture)).collect()
}

async fn create_result(service: Service, body: web::Json<NewCapture>) -> actix_web::Result<HttpResponse> {
    let request = body.into_inner();
    let capture = run(&service, move |s| s.create_capture(&request)).await?;
    Ok(HttpResponse::Created().json(CaptureDto::from(&capture)))
}

async fn update_result(
    service: Service,
    path: web::Path<i64>,
    body: web::Json<CaptureUpdate>,
) -> actix_web::Result<HttpResponse> {
    let id = path.into_inner();
    let update = body.into_inner();
    let capture = run(&service, move |s| s.update_capture(id, &update)).await?;
    Ok(HttpResponse::Ok().json(CaptureDto::from(&capture)))
}

async fn delete_result(service: Service, path: web::Path<i64>) -> actix_web::Result<HttpResponse> {
    let id = path.into_inner();
    run(&service, move |s| s.delete_capture(id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn apply_penalties(
    service: Service,
    path: web::Path<i64>,
    query: web::Query<PenaltyRequest>,
) -> actix_web::Result<HttpResponse> {
    let id = path.into_inner();
    let request = query.into_inner();
    let capture = run(&service, move |s| s.apply_penalties(id, &request)).await?;
    Ok(HttpResponse::Ok().json(CaptureDto::from(&capture)))
}

async fn update_elapsed_times(service: Service, path: web::Path<i64>) -> actix_web::Result<HttpResponse> {
    let event_id = path.into_inner();
    let summary = run(&service, move |s| s.recompute_elapsed_times(event_id)).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationQuery {
    event_id: i64,
    category_id: Option<i64>,
    stage_number: Option<i32>,
}

async fn classification(service: Service, query: web::Query<ClassificationQuery>) -> actix_web::Result<HttpResponse> {
    let query = query.into_inner();
    let scope = ClassificationScope::from_filters(query.category_id, query.stage_number);
    let rows = run(&service, move |s| s.classify(query.event_id, scope)).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn general_classification(service: Service, path: web::Path<i64>) -> actix_web::Result<HttpResponse> {
    let event_id = path.into_inner();
    let rows = run(&service, move |s| s.general_classification(event_id)).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn category_classification(service: Service, path: web::Path<(i64, i64)>) -> actix_web::Result<HttpResponse> {
    let (event_id, category_id) = path.into_inner();
    let rows = run(&service, move |s| s.category_classification(event_id, category_id)).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn stage_classification(service: Service, path: web::Path<(i64, i32)>) -> actix_web::Result<HttpResponse> {
    let (event_id, stage_order) = path.into_inner();
    let rows = run(&service, move |s| s.stage_classification(event_id, stage_order)).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn results_by_event(service: Service, path: web::Path<i64>) -> actix_web::Result<HttpResponse> {
    let event_id = path.into_inner();
    let views = run(&service, move |s| s.results_by_event(event_id)).await?;
    Ok(HttpResponse::Ok().json(dtos(&views)))
}

#[derive(Deserialize)]
struct StageRange {
    start: i32,
    end: i32,
}

async fn results_by_stage_range(
    service: Service,
    path: web::Path<i64>,
    range: web::Query<StageRange>,
) -> actix_web::Result<HttpResponse> {
    let event_id = path.into_inner();
    let StageRange { start, end } = range.into_inner();
    let views = run(&service, move |s| s.results_by_stage_range(event_id, start, end)).await?;
    Ok(HttpResponse::Ok().json(dtos(&views)))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let config = Config::load()?;
    let bind_addr = config.bind_addr.clone();
    let service = web::Data::new(connect_service(&config)?);

    info!(%bind_addr, chunk_size = config.chunk_size, "starting stage result server");
    HttpServer::new(move || {
        App::new().app_data(service.clone()).service(
            web::scope("/api/stageresults")
                .route("", web::post().to(create_result))
                .route("/classification", web::get().to(classification))
                .route("/classification/general/{event_id}", web::get().to(general_classification))
                .route(
                    "/classification/category/{event_id}/{category_id}",
                    web::get().to(category_classification),
                )
                .route(
                    "/classification/stage/{event_id}/{stage_order}",
                    web::get().to(stage_classification),
                )
                .route("/update-elapsed-times/{event_id}", web::post().to(update_elapsed_times))
                .route("/by-event/{event_id}", web::get().to(results_by_event))
                .route("/by-stage-range/{event_id}", web::get().to(results_by_stage_range))
                .route("/{id}", web::put().to(update_result))
                .route("/{id}", web::delete().to(delete_result))
                .route("/{id}/penalties", web::put().to(apply_penalties)),
        )
    })
    .bind(bind_addr)?
    .run()
    .await?;
    Ok(())
}
