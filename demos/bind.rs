use settings_binder::{Bindable, Fields, Loader};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Default)]
struct Database {
    url: Option<Url>,
    pool_size: i32,
}

impl Bindable for Database {
    fn describe(fields: &mut Fields<Self>) {
        fields.setting("url", |d| &d.url, |d| &mut d.url);
        fields
            .setting("pool_size", |d| &d.pool_size, |d| &mut d.pool_size)
            .default("4");
    }
}

#[derive(Debug, Default)]
struct Service {
    name: String,
    port: i32,
    peers: Vec<String>,
    database: Database,
}

impl Bindable for Service {
    fn describe(fields: &mut Fields<Self>) {
        fields.setting("name", |s| &s.name, |s| &mut s.name);
        fields.setting("port", |s| &s.port, |s| &mut s.port).default("8080");
        fields.setting("peers", |s| &s.peers, |s| &mut s.peers).optional();
        fields.nested("database", "database.", |s| &s.database, |s| &mut s.database);
    }
}

fn main() -> Result<(), settings_binder::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let service = Loader::new()
        .with_file("demos/settings.cfg", true)
        .with_env("SERVICE", "__")
        .bind::<Service>()?;

    println!("{} listens on {} (peers: {:?})", service.name, service.port, service.peers);
    if let Some(url) = &service.database.url {
        println!("database {url} with {} connections", service.database.pool_size);
    }

    println!("\n{}", service.render()?);
    Ok(())
}
