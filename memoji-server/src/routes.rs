use std::collections::BTreeMap;

use gender_detect::{DetailedGender, Gender, COMPARE_COUNTRIES};
use memoji::{normalize_country, random_name, AvatarRequest, AvatarService, CacheStatus};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use url::form_urlencoded;

use crate::error::ServerError;
use crate::http::{Request, Response};

/// Every route is also served under this prefix
pub const API_PREFIX: &str = "/api";

pub const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
pub const CONTENT_DISPOSITION: &str = "inline; filename=\"avatar.webp\"";

const WEBP_SUFFIX: &str = ".webp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectView {
    Simple,
    Detailed,
    Compare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/avatar`, `/avatar.webp`
    RandomAvatar,
    /// `/avatar/{name}[.webp]`, `/avatar/{name}/{gender}[.webp]`
    Avatar {
        name: String,
        gender: Option<String>,
    },
    /// `/detect-gender/{name}[/detailed|/compare]`
    DetectGender { name: String, view: DetectView },
}

impl Route {
    /// Matches a path with the API prefix already removed. Segments are
    /// percent-decoded after splitting.
    pub fn parse(path: &str) -> Option<Route> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        let route = match segments.as_slice() {
            ["avatar"] | ["avatar.webp"] => Route::RandomAvatar,
            ["avatar", name] => {
                let name = strip_webp(decode(name));
                if name.is_empty() {
                    Route::RandomAvatar
                } else {
                    Route::Avatar { name, gender: None }
                }
            }
            ["avatar", name, gender] => Route::Avatar {
                name: decode(name),
                gender: Some(strip_webp(decode(gender))),
            },
            ["detect-gender", name] => Route::detect(name, DetectView::Simple),
            ["detect-gender", name, "detailed"] => Route::detect(name, DetectView::Detailed),
            ["detect-gender", name, "compare"] => Route::detect(name, DetectView::Compare),
            _ => return None,
        };
        Some(route)
    }

    fn detect(name: &str, view: DetectView) -> Route {
        Route::DetectGender {
            name: decode(name),
            view,
        }
    }
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

fn strip_webp(segment: String) -> String {
    match segment.strip_suffix(WEBP_SUFFIX) {
        Some(stripped) => stripped.to_owned(),
        None => segment,
    }
}

/// Splits `/api/...` into the prefix and the remaining path
fn split_prefix(path: &str) -> (&str, &str) {
    match path.strip_prefix(API_PREFIX) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => (API_PREFIX, rest),
        _ => ("", path),
    }
}

/// `If-None-Match` check, including lists and `*`
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match
        .split(',')
        .map(|tag| tag.trim().trim_start_matches("W/"))
        .any(|tag| tag == "*" || tag == etag)
}

#[derive(Serialize)]
struct SimpleDetection<'a> {
    name: &'a str,
    detected_gender: Gender,
    country: Option<&'a str>,
}

#[derive(Serialize)]
struct DetailedDetection {
    #[serde(flatten)]
    detailed: DetailedGender,
    smart_detection: Gender,
}

#[derive(Serialize)]
struct ComparisonResults {
    default: Gender,
    #[serde(flatten)]
    countries: BTreeMap<String, Gender>,
    smart: Gender,
}

#[derive(Serialize)]
struct Comparison<'a> {
    name: &'a str,
    results: ComparisonResults,
    recommendation: Gender,
}

/// Maps requests onto the avatar service. Handling blocks on rendering.
pub struct Router {
    service: AvatarService,
}

impl Router {
    pub fn new(service: AvatarService) -> Self {
        Self { service }
    }

    pub fn handle(&self, request: &Request) -> Response {
        match self.dispatch(request) {
            Ok(response) => response,
            Err(err) => {
                if err.status() >= 500 {
                    log::error!("router: {} failed: {}", request.path, err);
                } else {
                    log::debug!("router: {} rejected: {}", request.path, err);
                }
                Response::from_error(&err)
            }
        }
    }

    fn dispatch(&self, request: &Request) -> Result<Response, ServerError> {
        if request.method != "GET" {
            return Err(ServerError::MethodNotAllowed(request.method.clone()));
        }

        let (prefix, path) = split_prefix(&request.path);
        let route =
            Route::parse(path).ok_or_else(|| ServerError::NotFound(request.path.clone()))?;

        match route {
            Route::RandomAvatar => Ok(self.random_redirect(prefix, request)),
            Route::Avatar { name, gender } => self.avatar(request, &name, gender.as_deref()),
            Route::DetectGender { name, view } => self.detect(request, &name, view),
        }
    }

    fn random_redirect(&self, prefix: &str, request: &Request) -> Response {
        let mut location = format!("{}/avatar/{}/random.webp", prefix, random_name());

        let mut query = form_urlencoded::Serializer::new(String::new());
        let mut carried = false;
        for param in ["color", "palette"] {
            if let Some(value) = request.query(param) {
                query.append_pair(param, value);
                carried = true;
            }
        }
        if carried {
            location.push('?');
            location.push_str(&query.finish());
        }

        Response::redirect(&location)
    }

    fn avatar(
        &self,
        request: &Request,
        name: &str,
        gender: Option<&str>,
    ) -> Result<Response, ServerError> {
        let avatar_request = AvatarRequest::from_params(
            Some(name),
            gender,
            request.query("color"),
            request.query("palette"),
            request.query("country"),
        );

        let plan = self.service.plan(&avatar_request)?;
        let etag = plan.key.etag();
        if let Some(if_none_match) = request.header("if-none-match") {
            if etag_matches(if_none_match, &etag) {
                return Ok(Response::new(304)
                    .with_header("ETag", &etag)
                    .with_header("Cache-Control", CACHE_CONTROL));
            }
        }

        let avatar = self.service.render_plan(plan).map_err(|err| {
            log::error!("router: rendering {:?} failed: {}", name, err);
            err
        })?;
        if avatar.status == CacheStatus::Rendered {
            log::info!("router: rendered {}", avatar.key);
        }

        Ok(Response::new(200)
            .with_header("Cache-Control", CACHE_CONTROL)
            .with_header("Content-Disposition", CONTENT_DISPOSITION)
            .with_header("ETag", &avatar.etag())
            .with_body(avatar.content_type, avatar.bytes))
    }

    fn detect(
        &self,
        request: &Request,
        name: &str,
        view: DetectView,
    ) -> Result<Response, ServerError> {
        let detector = self.service.detector();
        let country = normalize_country(request.query("country"));

        match view {
            DetectView::Simple => Response::json(&SimpleDetection {
                name,
                detected_gender: detector.detect(name, country.as_deref()),
                country: country.as_deref(),
            }),
            DetectView::Detailed => Response::json(&DetailedDetection {
                detailed: detector.detailed(name, country.as_deref()),
                smart_detection: detector.detect_smart(name),
            }),
            DetectView::Compare => {
                let comparison = detector.compare_countries(name, &COMPARE_COUNTRIES);
                Response::json(&Comparison {
                    name,
                    results: ComparisonResults {
                        default: comparison.default,
                        countries: comparison.countries,
                        smart: comparison.smart,
                    },
                    recommendation: comparison.smart,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use gender_detect::NameDictionary;
    use image::{Rgba, RgbaImage};
    use memoji::{CompositorHandle, ServiceConfig};
    use rstest::rstest;
    use serde_json::Value;
    use tempdir::TempDir;

    fn route(path: &str) -> Option<Route> {
        Route::parse(path)
    }

    fn avatar(name: &str, gender: Option<&str>) -> Option<Route> {
        Some(Route::Avatar {
            name: name.to_owned(),
            gender: gender.map(str::to_owned),
        })
    }

    #[rstest]
    #[case("/avatar", Some(Route::RandomAvatar))]
    #[case("/avatar.webp", Some(Route::RandomAvatar))]
    #[case("/avatar/", Some(Route::RandomAvatar))]
    #[case("/avatar/.webp", Some(Route::RandomAvatar))]
    #[case("/avatar/john", avatar("john", None))]
    #[case("/avatar/john.webp", avatar("john", None))]
    #[case("/avatar/John%20Smith.webp", avatar("John Smith", None))]
    #[case("/avatar/J%C3%B6rg", avatar("Jörg", None))]
    #[case("/avatar/a%2Fb", avatar("a/b", None))]
    #[case("/avatar/john/female.webp", avatar("john", Some("female")))]
    #[case("/avatar/john/female", avatar("john", Some("female")))]
    #[case("/avatar/john/robot.webp", avatar("john", Some("robot")))]
    #[case("/avatar/john/female/extra", None)]
    #[case("/", None)]
    #[case("/avatars/john", None)]
    #[case("/detect-gender", None)]
    #[case("/detect-gender/andrea/other", None)]
    fn parses_avatar_routes(#[case] path: &str, #[case] expected: Option<Route>) {
        assert_eq!(route(path), expected);
    }

    #[rstest]
    #[case("/detect-gender/andrea", DetectView::Simple)]
    #[case("/detect-gender/andrea/detailed", DetectView::Detailed)]
    #[case("/detect-gender/andrea/compare", DetectView::Compare)]
    fn parses_detection_routes(#[case] path: &str, #[case] view: DetectView) {
        assert_eq!(
            route(path),
            Some(Route::DetectGender {
                name: "andrea".to_owned(),
                view
            })
        );
    }

    #[rstest]
    #[case("/api/avatar/john", "/api", "/avatar/john")]
    #[case("/api", "/api", "")]
    #[case("/apiary/avatar", "", "/apiary/avatar")]
    #[case("/avatar", "", "/avatar")]
    fn splits_api_prefix(#[case] path: &str, #[case] prefix: &str, #[case] rest: &str) {
        assert_eq!(split_prefix(path), (prefix, rest));
    }

    #[rstest]
    #[case("\"k\"", true)]
    #[case("W/\"k\"", true)]
    #[case("\"x\", \"k\"", true)]
    #[case("*", true)]
    #[case("\"x\"", false)]
    #[case("k", false)]
    fn matches_etags(#[case] header: &str, #[case] expected: bool) {
        assert_eq!(etag_matches(header, "\"k\""), expected);
    }

    struct Fixture {
        dir: TempDir,
        router: Router,
    }

    fn write_png(path: &Path, shade: u8) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([shade, shade, 200, 255]))
            .save(path)
            .unwrap();
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new("memoji-server").unwrap();
        let assets = dir.path().join("assets");
        write_png(&assets.join("male/a.png"), 1);
        write_png(&assets.join("female/a.png"), 2);
        for i in 1..=58u8 {
            write_png(&assets.join(format!("v1/{}.png", i)), i);
        }

        let config = ServiceConfig {
            assets,
            storage: dir.path().join("storage"),
            existence_ttl: Duration::from_secs(60),
            decoded_capacity: 8,
        };
        let service = AvatarService::new(
            &config,
            Box::new(NameDictionary::builtin()),
            CompositorHandle::image(),
        )
        .unwrap();

        Fixture {
            dir,
            router: Router::new(service),
        }
    }

    fn get(router: &Router, target: &str, headers: &[(&str, &str)]) -> Response {
        let mut raw = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n", target);
        for (name, value) in headers {
            raw.push_str(&format!("{}: {}\r\n", name, value));
        }
        raw.push_str("\r\n");
        let request = Request::parse(raw.as_bytes()).unwrap().unwrap();
        router.handle(&request)
    }

    fn json(response: &Response) -> Value {
        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type"), Some("application/json"));
        serde_json::from_slice(&response.body).unwrap()
    }

    #[test]
    fn serves_avatar_with_cache_headers() {
        let fixture = fixture();
        let response = get(&fixture.router, "/avatar/john.webp", &[]);

        assert_eq!(response.status, 200);
        assert_eq!(response.header("Content-Type"), Some("image/webp"));
        assert_eq!(response.header("Cache-Control"), Some(CACHE_CONTROL));
        assert_eq!(response.header("Content-Disposition"), Some(CONTENT_DISPOSITION));
        assert_eq!(&response.body[..4], b"RIFF");

        let etag = response.header("ETag").unwrap();
        assert!(etag.starts_with("\"527bd5b5d689e2c32ae974c6229ff785_male_"));

        let again = get(&fixture.router, "/api/avatar/john", &[]);
        assert_eq!(again.body, response.body);
        assert_eq!(again.header("ETag"), Some(etag));
    }

    #[test]
    fn matching_etag_is_not_modified() {
        let fixture = fixture();
        let first = get(&fixture.router, "/avatar/sarah", &[]);
        let etag = first.header("ETag").unwrap().to_owned();

        let response = get(&fixture.router, "/avatar/sarah", &[("If-None-Match", &etag)]);
        assert_eq!(response.status, 304);
        assert!(response.body.is_empty());
        assert_eq!(response.header("ETag"), Some(etag.as_str()));

        let other = get(&fixture.router, "/avatar/sarah?color=1", &[("If-None-Match", &etag)]);
        assert_eq!(other.status, 200);
    }

    #[test]
    fn explicit_gender_changes_the_variant() {
        let fixture = fixture();
        let detected = get(&fixture.router, "/avatar/john", &[]);
        let forced = get(&fixture.router, "/avatar/john/female.webp", &[]);

        assert_eq!(forced.status, 200);
        assert!(forced.header("ETag").unwrap().contains("_female_override_"));
        assert_ne!(detected.header("ETag"), forced.header("ETag"));
    }

    #[test]
    fn invalid_parameters_still_render() {
        let fixture = fixture();
        let response = get(
            &fixture.router,
            "/avatar/john/robot?color=banana&palette=neon&country=%2E%2E",
            &[],
        );
        assert_eq!(response.status, 200);
    }

    #[rstest]
    #[case("/avatar", "/avatar/")]
    #[case("/avatar.webp?color=3&palette=pale&country=US", "/avatar/")]
    #[case("/api/avatar", "/api/avatar/")]
    fn missing_name_redirects(#[case] target: &str, #[case] location_prefix: &str) {
        let fixture = fixture();
        let response = get(&fixture.router, target, &[]);

        assert_eq!(response.status, 302);
        let location = response.header("Location").unwrap();
        assert!(location.starts_with(location_prefix));

        let rest = &location[location_prefix.len()..];
        let (name, tail) = rest.split_at(memoji::RANDOM_NAME_LEN);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(tail.starts_with("/random.webp"));
        if target.contains('?') {
            assert_eq!(tail, "/random.webp?color=3&palette=pale");
        }
    }

    #[test]
    fn detects_gender() {
        let fixture = fixture();
        let body = json(&get(&fixture.router, "/detect-gender/john", &[]));
        assert_eq!(body["name"], "john");
        assert_eq!(body["detected_gender"], "male");
        assert_eq!(body["country"], Value::Null);

        let body = json(&get(&fixture.router, "/api/detect-gender/andrea?country=US", &[]));
        assert_eq!(body["detected_gender"], "female");
        assert_eq!(body["country"], "US");
    }

    #[test]
    fn detailed_detection_includes_smart_result() {
        let fixture = fixture();
        let body = json(&get(&fixture.router, "/detect-gender/andrea/detailed", &[]));

        assert_eq!(body["name"], "andrea");
        assert_eq!(body["detected_gender"], "random");
        assert_eq!(body["raw_result"], "Unisex");
        assert_eq!(body["is_confident"], false);
        assert_eq!(body["smart_detection"], "female");
    }

    #[test]
    fn compares_countries() {
        let fixture = fixture();
        let body = json(&get(&fixture.router, "/detect-gender/andrea/compare", &[]));

        assert_eq!(body["name"], "andrea");
        let results = body["results"].as_object().unwrap();
        assert_eq!(results.len(), COMPARE_COUNTRIES.len() + 2);
        assert_eq!(results["default"], "random");
        assert_eq!(results["IT"], "male");
        assert_eq!(results["US"], "female");
        assert_eq!(results["smart"], "female");
        assert_eq!(body["recommendation"], "female");
    }

    #[rstest]
    #[case("/", 404)]
    #[case("/favicon.ico", 404)]
    #[case("/detect-gender/john/everything", 404)]
    fn unknown_routes_are_not_found(#[case] target: &str, #[case] status: u16) {
        let fixture = fixture();
        assert_eq!(get(&fixture.router, target, &[]).status, status);
    }

    #[test]
    fn only_get_is_allowed() {
        let fixture = fixture();
        let request = Request::parse(b"POST /avatar/john HTTP/1.1\r\n\r\n")
            .unwrap()
            .unwrap();
        let response = fixture.router.handle(&request);
        assert_eq!(response.status, 405);
        assert_eq!(response.header("Allow"), Some("GET"));
    }

    #[test]
    fn missing_assets_are_server_errors() {
        let fixture = fixture();
        std::fs::remove_dir_all(fixture.dir.path().join("assets/v1")).unwrap();
        let response = get(&fixture.router, "/avatar/zzqx/random", &[]);
        assert_eq!(response.status, 500);
    }
}
