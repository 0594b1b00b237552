use std::{process::ExitCode, sync::Arc};

use strt_di::{
    Arguments, Autowire, Class, Container, ContainerConfig, DynError, Initialize, Parameter,
    ServiceProvider, ServiceTable,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match ContainerConfig::from_file(&path) {
            Ok(config) => config,
            Err(error) => {
                tracing::error!("{error}");
                return ExitCode::FAILURE;
            }
        },
        None => ContainerConfig::default(),
    };

    let table = ServiceTable::new()
        .service("helper", Class::initializable::<Helper>())
        .service("setup", Class::initializable::<Setup>())
        .service("widget", Class::initializable::<Widget>())
        .service("asset", Class::initializable::<Asset>())
        .service("theme_hook", Class::initializable::<ThemeHook>());

    let provider = ServiceProvider::new(Container::with_config(config), table);
    provider.register();

    match provider.boot() {
        Ok(report) => {
            for (key, outcome) in &report.outcomes {
                println!("{key}: {outcome:?}");
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

struct Helper;
impl Autowire for Helper {
    fn class_name() -> &'static str {
        "Helper"
    }

    fn parameters() -> Vec<Parameter> {
        vec![]
    }

    fn construct(_: &Arguments) -> Result<Self, DynError> {
        Ok(Helper)
    }
}
impl Initialize for Helper {
    fn init(&self) -> Result<(), DynError> {
        tracing::info!("Helper ready");
        Ok(())
    }
}

struct Setup {
    content_width: u32,
}
impl Autowire for Setup {
    fn class_name() -> &'static str {
        "Setup"
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::value_or("content_width", 1140u32)]
    }

    fn construct(args: &Arguments) -> Result<Self, DynError> {
        Ok(Setup {
            content_width: args.value("content_width")?,
        })
    }
}
impl Initialize for Setup {
    fn init(&self) -> Result<(), DynError> {
        tracing::info!("Theme set up with content width {}", self.content_width);
        Ok(())
    }
}

struct Widget;
impl Autowire for Widget {
    fn class_name() -> &'static str {
        "Widget"
    }

    fn parameters() -> Vec<Parameter> {
        vec![]
    }

    fn construct(_: &Arguments) -> Result<Self, DynError> {
        Ok(Widget)
    }
}
impl Initialize for Widget {
    fn init(&self) -> Result<(), DynError> {
        tracing::info!("Sidebars registered");
        Ok(())
    }
}

struct Asset {
    _helper: Arc<Helper>,
}
impl Autowire for Asset {
    fn class_name() -> &'static str {
        "Asset"
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::service::<Helper>("helper")]
    }

    fn construct(args: &Arguments) -> Result<Self, DynError> {
        Ok(Asset {
            _helper: args.service("helper")?,
        })
    }
}
impl Initialize for Asset {
    fn init(&self) -> Result<(), DynError> {
        tracing::info!("Assets enqueued");
        Ok(())
    }
}

struct ThemeHook {
    asset: Option<Arc<Asset>>,
}
impl Autowire for ThemeHook {
    fn class_name() -> &'static str {
        "ThemeHook"
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::optional::<Asset>("asset")]
    }

    fn construct(args: &Arguments) -> Result<Self, DynError> {
        Ok(ThemeHook {
            asset: args.optional("asset")?,
        })
    }
}
impl Initialize for ThemeHook {
    fn init(&self) -> Result<(), DynError> {
        tracing::info!("Hooks attached, assets available: {}", self.asset.is_some());
        Ok(())
    }
}
