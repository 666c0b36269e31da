use partnerscraper::adapters::SourceId;
use std::fmt::Write as _;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve `body` at `url_path` with the given content type.
pub async fn mount_page(server: &MockServer, url_path: &str, body: &str, content_type: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", content_type),
        )
        .mount(server)
        .await;
}

/// Respond to `url_path` with a bare status code.
pub async fn mount_status(server: &MockServer, url_path: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Config text pointing each listed source at `/<source>` on the mock server.
pub fn config_for(server_uri: &str, sources: &[SourceId]) -> String {
    let mut config = String::from(
        "[http]\nuser_agent = \"partnerscraper-test/1.0\"\nrequest_timeout_secs = 5\n\n[output]\ndirectory = \"data\"\n",
    );
    for source in sources {
        let extension = if *source == SourceId::StarterStory { "json" } else { "csv" };
        let _ = write!(
            config,
            "\n[sources.{id}]\nurl = \"{uri}/{id}\"\noutput_file = \"{id}.{ext}\"\n",
            id = source,
            uri = server_uri,
            ext = extension
        );
    }
    config
}
