use autowire::assembler::AssemblerBuilder;
use autowire::instance_provider::{InstancePtr, TypedInstanceProvider};
use autowire::{component_alias, injectable, Component};

#[injectable]
trait Plugin {
    fn name(&self) -> &'static str;
}

// the struct attribute registers components statically, so they don't need to be registered by
// hand; higher priority components are registered first
#[derive(Component)]
#[component(priority = 10)]
struct AuthPlugin;

#[component_alias]
impl Plugin for AuthPlugin {
    fn name(&self) -> &'static str {
        "auth"
    }
}

#[derive(Component)]
#[component]
struct MetricsPlugin;

#[component_alias]
impl Plugin for MetricsPlugin {
    fn name(&self) -> &'static str {
        "metrics"
    }
}

#[derive(Component)]
#[component(profiles = ["debug"])]
struct ProfilerPlugin;

#[component_alias]
impl Plugin for ProfilerPlugin {
    fn name(&self) -> &'static str {
        "profiler"
    }
}

#[derive(Component)]
#[component(singleton = false)]
struct Host {
    // all registered plugins eligible for the active profile, in registration order
    plugins: Vec<InstancePtr<dyn Plugin + Send + Sync>>,
}

impl Host {
    fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }
}

fn main() {
    let mut assembler = AssemblerBuilder::new()
        .with_static_components()
        .build()
        .expect("error registering components");

    // prints ["auth", "metrics"]
    println!(
        "{:?}",
        assembler
            .assemble::<Host>()
            .expect("error assembling Host")
            .names()
    );

    // prints ["auth", "metrics", "profiler"]
    println!(
        "{:?}",
        assembler
            .assemble_for_profile::<Host>("debug")
            .expect("error assembling Host")
            .names()
    );
}
