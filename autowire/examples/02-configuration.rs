use autowire::assembler::AssemblerBuilder;
use autowire::component_registry::Registration;
use autowire::config::ConfigLoader;
use autowire::instance_provider::{InstancePtr, TypedInstanceProvider};
use autowire::value_store::ValueStore;
use autowire::Component;
use tracing_subscriber::EnvFilter;

#[derive(Component)]
struct Database {
    // read from DATABASE_URL when injected into a "database" field
    url: String,
    #[component(default = "default_pool_size")]
    pool_size: u32,
}

fn default_pool_size() -> u32 {
    4
}

#[derive(Component)]
struct Server {
    database: InstancePtr<Database>,
    // explicit key, regardless of assembly path
    #[component(setting = "listen_port")]
    port: u16,
    #[component(default)]
    verbose: bool,
}

// try running with: DEMO_LISTEN_PORT=9000 cargo run --example 02-configuration -- --database_pool_size=16
fn main() {
    // RUST_LOG=autowire=trace shows how every parameter gets resolved
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut values = ValueStore::new();

    // values can be added programmatically, in sections which get flattened to SECTION_KEY
    values
        .add([
            ("database", vec![("url", "postgres://localhost/demo")]),
            ("", vec![("listen_port", "8080")]),
        ])
        .expect("error adding values");

    // environment variables with the DEMO_ prefix and --key=value arguments override the above;
    // configuration files could be given here as well
    ConfigLoader::new("demo")
        .load::<&str>(&mut values, &[])
        .expect("error loading configuration");

    let mut assembler = AssemblerBuilder::new()
        .register_component(Registration::component::<Database>())
        .with_values(values)
        .build()
        .expect("error registering components");

    let server = assembler
        .assemble::<Server>()
        .expect("error assembling Server");

    println!(
        "Listening on {} (verbose: {}) using {} with {} connections",
        server.port, server.verbose, server.database.url, server.database.pool_size
    );
}
