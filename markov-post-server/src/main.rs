use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{get, post, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use markov_post_core::config::GenerationConfig;
use markov_post_core::rate_limit::{RateLimitResult, RateLimiter};
use markov_post_core::generate_document;

mod reply;
mod settings;

use reply::{command_reply, ellipsis, parse_command, throttled, INTERNAL_ERROR, MAX_REPLY_CHARS, NOT_ENOUGH_TEXT};
use settings::Settings;

/// Body of `POST /v1/messages`, one chat message.
#[derive(Deserialize)]
struct MessageBody {
	identity: String,
	name: Option<String>,
	text: String,
}

/// Body of `POST /v1/generate`, text already extracted upstream.
#[derive(Deserialize)]
struct GenerateBody {
	identity: String,
	blocks: Vec<String>,
}

#[derive(Deserialize)]
struct RateLimitQuery {
	identity: String,
}

#[derive(Serialize)]
struct RateLimitStatus {
	allowed: bool,
}

/// State shared by every worker. Nothing here needs a lock: the limiter
/// synchronizes inside its store and models are built per request.
struct SharedData {
	limiter: RateLimiter,
	generation: GenerationConfig,
	namespace: String,
	trust_client_identity: bool,
}

impl SharedData {
	fn new(settings: &Settings) -> Self {
		Self {
			limiter: RateLimiter::in_memory(settings.rate_limit.clone()),
			generation: settings.generation.clone(),
			namespace: settings.server.namespace.clone(),
			trust_client_identity: settings.server.trust_client_identity,
		}
	}

	/// Who the quota is charged to.
	///
	/// The body's `identity` is only a label unless the deployment trusts
	/// it; otherwise callers are told apart by peer IP, so exemptions must
	/// then list addresses.
	fn quota_identity(&self, req: &HttpRequest, claimed: &str) -> String {
		if self.trust_client_identity {
			return claimed.to_owned();
		}
		match req.peer_addr() {
			Some(addr) => addr.ip().to_string(),
			None => "unknown".to_owned(),
		}
	}

	fn check(&self, req: &HttpRequest, claimed: &str) -> RateLimitResult {
		self.limiter.check(&self.namespace, &self.quota_identity(req, claimed))
	}

	fn is_allowed(&self, req: &HttpRequest, claimed: &str) -> bool {
		self.limiter.is_allowed(&self.namespace, &self.quota_identity(req, claimed))
	}
}

/// Why a generation produced no document.
enum GenerationFailure {
	NoMaterial,
	Internal,
}

/// Runs the whole pipeline on the blocking thread pool.
///
/// Internal faults are logged here; callers only see the failure kind.
async fn run_generation(blocks: Vec<String>, config: GenerationConfig) -> Result<String, GenerationFailure> {
	let result = web::block(move || {
		generate_document(&blocks, &config, &mut rand::rng()).map(|document| document.to_string())
	})
	.await;

	match result {
		Ok(Ok(document)) => Ok(document),
		Ok(Err(e)) if e.is_insufficient_material() => Err(GenerationFailure::NoMaterial),
		Ok(Err(e)) => {
			error!("Generation failed: {e}");
			Err(GenerationFailure::Internal)
		}
		Err(e) => {
			error!("Generation task failed: {e}");
			Err(GenerationFailure::Internal)
		}
	}
}

fn too_many_requests(limit: RateLimitResult) -> HttpResponse {
	HttpResponse::TooManyRequests()
		.insert_header((header::RETRY_AFTER, limit.reset_seconds.to_string()))
		.body(throttled(limit.reset_seconds))
}

/// HTTP POST endpoint `/v1/messages`
///
/// Chat-style entry point:
/// - `/help` and `/start` reply with usage, other commands are rejected
/// - anything else is rate limited, then used as the corpus
/// - replies never exceed `MAX_REPLY_CHARS`
#[post("/v1/messages")]
async fn post_message(req: HttpRequest, data: web::Data<SharedData>, body: web::Json<MessageBody>) -> impl Responder {
	let body = body.into_inner();
	let longname = match &body.name {
		Some(name) => format!("{} ({})", body.identity, name),
		None => body.identity.clone(),
	};
	info!("Message from {longname}: {:?}", body.text);

	if let Some(command) = parse_command(&body.text) {
		return HttpResponse::Ok().body(command_reply(command));
	}

	let limit = data.check(&req, &body.identity);
	if !limit.allowed {
		warn!("Message from {longname}: throttled (resets in {} seconds)", limit.reset_seconds);
		return too_many_requests(limit);
	}

	let text = body.text.trim().to_owned();
	match run_generation(vec![text], data.generation.clone()).await {
		Ok(document) => HttpResponse::Ok().body(ellipsis(&document, MAX_REPLY_CHARS)),
		Err(GenerationFailure::NoMaterial) => HttpResponse::Ok().body(NOT_ENOUGH_TEXT),
		Err(GenerationFailure::Internal) => HttpResponse::InternalServerError().body(INTERNAL_ERROR),
	}
}

/// HTTP POST endpoint `/v1/generate`
///
/// Generates a document from pre-extracted text blocks.
/// `422` when the blocks are too poor, `429` when throttled.
#[post("/v1/generate")]
async fn post_generate(req: HttpRequest, data: web::Data<SharedData>, body: web::Json<GenerateBody>) -> impl Responder {
	let body = body.into_inner();

	let limit = data.check(&req, &body.identity);
	if !limit.allowed {
		warn!("Generate from {}: throttled (resets in {} seconds)", body.identity, limit.reset_seconds);
		return too_many_requests(limit);
	}

	match run_generation(body.blocks, data.generation.clone()).await {
		Ok(document) => HttpResponse::Ok().body(document),
		Err(GenerationFailure::NoMaterial) => HttpResponse::UnprocessableEntity().body(NOT_ENOUGH_TEXT),
		Err(GenerationFailure::Internal) => HttpResponse::InternalServerError().body(INTERNAL_ERROR),
	}
}

/// HTTP GET endpoint `/v1/rate_limit`
///
/// Advisory check, does not count as a hit.
#[get("/v1/rate_limit")]
async fn get_rate_limit(
	req: HttpRequest,
	data: web::Data<SharedData>,
	query: web::Query<RateLimitQuery>,
) -> impl Responder {
	let allowed = data.is_allowed(&req, &query.identity);
	HttpResponse::Ok().json(RateLimitStatus { allowed })
}

/// CORS policy: only the configured origins, only the methods in use.
fn cors(origins: &[String]) -> Cors {
	origins.iter().fold(
		Cors::default().allowed_methods(vec!["GET", "POST"]).allow_any_header().max_age(3600),
		|cors, origin| cors.allowed_origin(origin),
	)
}

fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(post_message).service(post_generate).service(get_rate_limit);
}

/// Main entry point for the server.
///
/// Reads settings (see `MARKOV_POST_CONFIG`), then starts an Actix-web
/// HTTP server on the configured address.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let settings = Settings::load().map_err(std::io::Error::other)?;
	let shared_data = web::Data::new(SharedData::new(&settings));
	info!(
		"Listening on {}:{} (rate limit {} per {}s)",
		settings.server.host, settings.server.port, settings.rate_limit.max, settings.rate_limit.window_seconds
	);

	let origins = settings.server.cors_origins.clone();
	if !settings.server.trust_client_identity {
		info!("Rate limiting by peer address");
	}

	HttpServer::new(move || {
		App::new()
			.wrap(cors(&origins))
			.app_data(shared_data.clone())
			.configure(routes)
	})
		.bind((settings.server.host.as_str(), settings.server.port))?
		.run()
		.await
}
