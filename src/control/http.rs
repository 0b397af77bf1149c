//! The synchronous HTTP admin API: one thread accepts connections and handles
//! each request to completion before accepting the next. Dispatch matches on
//! `(method, url_parts)`, with the handful of routes that embed an arbitrary URL as
//! a path segment handled by prefix/suffix stripping instead, since those segments
//! may contain further slashes.

use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tiny_http::{Method, Request, Response, ResponseBox, Server};

use crate::context::AppContext;
use crate::control::blocklist_manifest::AdlistStatus;
use crate::control::credentials;

pub struct ControlServer {
    context: Arc<AppContext>,
}

impl ControlServer {
    pub fn new(context: Arc<AppContext>) -> ControlServer {
        ControlServer { context }
    }

    pub fn run(self) {
        let server = match Server::http(("0.0.0.0", self.context.api_port)) {
            Ok(s) => s,
            Err(e) => {
                log::error!("failed to start control plane on port {}: {}", self.context.api_port, e);
                std::process::exit(1);
            }
        };

        log::info!("control plane listening on {}", self.context.api_port);

        for mut request in server.incoming_requests() {
            if self.context.is_shutting_down() {
                let _ = request.respond(Response::from_string("shutting down").with_status_code(503));
                continue;
            }

            log::info!("admin {:?} {:?}", request.method(), request.url());
            let response = self.dispatch(&mut request);
            if let Err(e) = request.respond(response) {
                log::warn!("failed to write admin response: {}", e);
            }
        }
    }

    fn dispatch(&self, request: &mut Request) -> ResponseBox {
        let method = request.method().clone();
        let url = request.url().to_string();
        let path = url.split('?').next().unwrap_or("").to_string();
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match (&method, parts.as_slice()) {
            (Method::Post, ["api", "adcache", "enable"]) => self.adcache_enable(),
            (Method::Post, ["api", "adcache", "disable"]) => self.adcache_disable(),
            (Method::Get, ["api", "upstream"]) => self.get_upstream(),
            (Method::Put, ["api", "upstream"]) => self.set_upstream(request),
            (Method::Post, ["api", "local"]) => self.add_local(request),
            (Method::Post, ["api", "adlist"]) => self.add_adlist(request),
            (Method::Post, ["api", "adlist", "reload"]) => self.reload_adlists(),
            (Method::Put, ["api", "threads"]) => self.set_threads(request),
            (Method::Get, ["api", "stats", "queries"]) => self.stats_queries(),
            (Method::Get, ["api", "stats", "adlist-domains"]) => self.stats_adlist_domains(),
            (Method::Get, ["api", "stats", "cache-lookup-time"]) => {
                self.stats_average(self.context.stats.cache_lookup_latency.average())
            }
            (Method::Get, ["api", "stats", "cache-response-time"]) => {
                self.stats_average(self.context.stats.cached_response_latency.average())
            }
            (Method::Get, ["api", "stats", "upstream-response-time"]) => {
                self.stats_average(self.context.stats.uncached_response_latency.average())
            }
            (Method::Get, ["api", "logs"]) => self.logs(),
            (Method::Get, ["metrics"]) => self.metrics(),
            (Method::Post, ["api", "login"]) => self.login(request),
            (Method::Post, ["api", "restart"]) => self.restart(),
            (Method::Delete, _) if path.starts_with("/api/local/") => {
                self.remove_local(&path["/api/local/".len()..])
            }
            (Method::Delete, _) if path.starts_with("/api/adlist/") => {
                self.remove_adlist(&path["/api/adlist/".len()..])
            }
            (Method::Post, _) if path.starts_with("/api/adlist/") && path.ends_with("/enable") => {
                self.set_adlist_status(strip_both(&path, "/api/adlist/", "/enable"), AdlistStatus::Enabled)
            }
            (Method::Post, _) if path.starts_with("/api/adlist/") && path.ends_with("/disable") => {
                self.set_adlist_status(strip_both(&path, "/api/adlist/", "/disable"), AdlistStatus::Disabled)
            }
            _ => not_found(),
        }
    }

    fn adcache_enable(&self) -> ResponseBox {
        self.context.ad_cache_enabled.store(true, std::sync::atomic::Ordering::Release);
        ok_json(&StatusBody { ok: true })
    }

    fn adcache_disable(&self) -> ResponseBox {
        self.context.ad_cache_enabled.store(false, std::sync::atomic::Ordering::Release);
        ok_json(&StatusBody { ok: true })
    }

    fn get_upstream(&self) -> ResponseBox {
        ok_json(&UpstreamBody {
            upstream: self.context.upstream().to_string(),
        })
    }

    fn set_upstream(&self, request: &mut Request) -> ResponseBox {
        let body: UpstreamBody = match read_json(request) {
            Ok(b) => b,
            Err(r) => return r,
        };
        let Some(addr) = crate::context::parse_ipv4(&body.upstream) else {
            return bad_request("upstream is not a valid ipv4 address");
        };

        *self.context.upstream.lock() = addr;
        if let Err(e) = self.context.config.lock().set_upstream(addr) {
            log::error!("failed to persist upstream: {}", e);
            return internal_error("failed to persist upstream");
        }
        ok_json(&StatusBody { ok: true })
    }

    fn add_local(&self, request: &mut Request) -> ResponseBox {
        let body: LocalEntryBody = match read_json(request) {
            Ok(b) => b,
            Err(r) => return r,
        };
        if !crate::cache::layer::CacheLayer::is_valid_ipv4(&body.ip)
            || !crate::cache::layer::CacheLayer::is_valid_domain(&body.domain)
        {
            return bad_request("invalid ip or domain");
        }

        let mut overrides = self.context.overrides.lock();
        if let Err(e) = overrides.add(&body.ip, &body.domain, body.name.as_deref().unwrap_or("")) {
            log::error!("failed to persist local override: {}", e);
            return internal_error("failed to persist local override");
        }
        if let Err(e) = self.context.cache.reload_local_overrides(&overrides) {
            log::error!("failed to reload local overrides: {}", e);
        }
        ok_json(&StatusBody { ok: true })
    }

    fn remove_local(&self, domain: &str) -> ResponseBox {
        let mut overrides = self.context.overrides.lock();
        let removed = match overrides.remove(domain) {
            Ok(r) => r,
            Err(e) => {
                log::error!("failed to persist local override removal: {}", e);
                return internal_error("failed to persist local override removal");
            }
        };
        if let Err(e) = self.context.cache.reload_local_overrides(&overrides) {
            log::error!("failed to reload local overrides: {}", e);
        }
        ok_json(&StatusBody { ok: removed })
    }

    fn add_adlist(&self, request: &mut Request) -> ResponseBox {
        let body: AdlistUrlBody = match read_json(request) {
            Ok(b) => b,
            Err(r) => return r,
        };
        let mut manifest = self.context.manifest.lock();
        if let Err(e) = manifest.add(&body.url) {
            log::error!("failed to persist adlist: {}", e);
            return internal_error("failed to persist adlist");
        }
        self.rebuild_blocklist(&manifest);
        ok_json(&StatusBody { ok: true })
    }

    fn remove_adlist(&self, url: &str) -> ResponseBox {
        let mut manifest = self.context.manifest.lock();
        let removed = match manifest.remove(url) {
            Ok(r) => r,
            Err(e) => {
                log::error!("failed to persist adlist removal: {}", e);
                return internal_error("failed to persist adlist removal");
            }
        };
        self.rebuild_blocklist(&manifest);
        ok_json(&StatusBody { ok: removed })
    }

    fn set_adlist_status(&self, url: &str, status: AdlistStatus) -> ResponseBox {
        let mut manifest = self.context.manifest.lock();
        let found = match manifest.set_status(url, status) {
            Ok(f) => f,
            Err(e) => {
                log::error!("failed to persist adlist status: {}", e);
                return internal_error("failed to persist adlist status");
            }
        };
        self.rebuild_blocklist(&manifest);
        ok_json(&StatusBody { ok: found })
    }

    fn reload_adlists(&self) -> ResponseBox {
        let manifest = self.context.manifest.lock();
        self.rebuild_blocklist(&manifest);
        ok_json(&StatusBody { ok: true })
    }

    fn rebuild_blocklist(&self, manifest: &crate::control::blocklist_manifest::BlocklistManifest) {
        self.context.cache.wipe_blocklist();
        if let Err(e) = self
            .context
            .cache
            .load_blocklists(manifest, &self.context.paths.listdata_dir)
        {
            log::error!("failed to reload blocklists: {}", e);
        }
    }

    fn set_threads(&self, request: &mut Request) -> ResponseBox {
        let body: ThreadsBody = match read_json(request) {
            Ok(b) => b,
            Err(r) => return r,
        };
        if body.threads == 0 {
            return bad_request("threads must be at least 1");
        }
        self.context
            .threads
            .store(body.threads, std::sync::atomic::Ordering::Release);
        if let Err(e) = self.context.config.lock().set_threads(body.threads) {
            log::error!("failed to persist thread count: {}", e);
            return internal_error("failed to persist thread count");
        }
        ok_json(&ThreadsBody { threads: body.threads })
    }

    fn stats_queries(&self) -> ResponseBox {
        let snapshot = self.context.counters.snapshot(self.context.queue.depth());
        ok_json(&snapshot)
    }

    fn stats_adlist_domains(&self) -> ResponseBox {
        ok_json(&CountBody {
            count: self.context.cache.blocklist_domains(),
        })
    }

    fn stats_average(&self, average_seconds: f64) -> ResponseBox {
        ok_json(&AverageBody {
            average_seconds,
        })
    }

    fn metrics(&self) -> ResponseBox {
        let body = crate::metrics::render(&self.context);
        Response::from_string(body)
            .with_header(
                "Content-Type: text/plain; version=0.0.4"
                    .parse::<tiny_http::Header>()
                    .unwrap(),
            )
            .boxed()
    }

    fn logs(&self) -> ResponseBox {
        let contents = std::fs::read_to_string(&self.context.paths.data_file.with_file_name("server.log"))
            .unwrap_or_default();
        let tail: String = contents.lines().rev().take(200).collect::<Vec<_>>().into_iter().rev().collect::<Vec<_>>().join("\n");
        ok_json(&LogBody { log: tail })
    }

    fn login(&self, request: &mut Request) -> ResponseBox {
        let body: LoginBody = match read_json(request) {
            Ok(b) => b,
            Err(r) => return r,
        };
        let config = self.context.config.lock();
        match credentials::verify(config.credentials.as_ref(), &body.username, &body.password) {
            Ok(()) => ok_json(&StatusBody { ok: true }),
            Err(_) => {
                Response::from_string("{\"ok\":false}")
                    .with_status_code(401)
                    .with_header(json_content_type())
                    .boxed()
            }
        }
    }

    fn restart(&self) -> ResponseBox {
        self.context.request_shutdown();
        ok_json(&StatusBody { ok: true })
    }
}

fn strip_both<'a>(path: &'a str, prefix: &str, suffix: &str) -> &'a str {
    path.strip_prefix(prefix)
        .and_then(|s| s.strip_suffix(suffix))
        .unwrap_or("")
}

fn read_json<T: for<'de> Deserialize<'de>>(request: &mut Request) -> Result<T, ResponseBox> {
    let mut content = String::new();
    if request.as_reader().read_to_string(&mut content).is_err() {
        return Err(bad_request("failed to read request body"));
    }
    serde_json::from_str(&content).map_err(|_| bad_request("malformed json body"))
}

fn json_content_type() -> tiny_http::Header {
    "Content-Type: application/json".parse().unwrap()
}

fn ok_json<T: Serialize>(body: &T) -> ResponseBox {
    let encoded = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::from_string(encoded)
        .with_header(json_content_type())
        .boxed()
}

fn bad_request(message: &str) -> ResponseBox {
    Response::from_string(serde_json::json!({ "error": message }).to_string())
        .with_status_code(400)
        .with_header(json_content_type())
        .boxed()
}

fn internal_error(message: &str) -> ResponseBox {
    Response::from_string(serde_json::json!({ "error": message }).to_string())
        .with_status_code(500)
        .with_header(json_content_type())
        .boxed()
}

fn not_found() -> ResponseBox {
    Response::from_string(serde_json::json!({ "error": "not found" }).to_string())
        .with_status_code(404)
        .with_header(json_content_type())
        .boxed()
}

#[derive(Serialize, Deserialize)]
struct StatusBody {
    ok: bool,
}

#[derive(Serialize, Deserialize)]
struct UpstreamBody {
    upstream: String,
}

#[derive(Serialize, Deserialize)]
struct LocalEntryBody {
    ip: String,
    domain: String,
    name: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct AdlistUrlBody {
    url: String,
}

#[derive(Serialize, Deserialize)]
struct ThreadsBody {
    threads: usize,
}

#[derive(Serialize, Deserialize)]
struct CountBody {
    count: u32,
}

#[derive(Serialize, Deserialize)]
struct AverageBody {
    average_seconds: f64,
}

#[derive(Serialize, Deserialize)]
struct LogBody {
    log: String,
}

#[derive(Serialize, Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}
