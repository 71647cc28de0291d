//! Runtime pipeline shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::asset::Asset;
use crate::config::PipelineConfig;
use crate::events::SharedObserver;
use crate::handler::{AssetHandler, BoxHandler, StaticFiles, Timing};
use crate::strategy::Strategy;

/// One configured asset and the strategy that rebuilds it.
pub struct Entry {
    pub asset: Arc<Asset>,
    pub strategy: Arc<dyn Strategy>,
}

/// Assets in config file order.
pub struct Pipeline {
    entries: Vec<Entry>,
}

impl Pipeline {
    /// Construct every `[[asset]]`, compiling its pattern.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let entries = config
            .asset
            .iter()
            .enumerate()
            .map(|(index, asset)| {
                let built = asset
                    .to_asset()
                    .with_context(|| format!("invalid asset[{index}] (uri `{}`)", asset.uri))?;
                Ok(Entry {
                    asset: Arc::new(built),
                    strategy: asset.to_strategy(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Assemble the request chain around a static file handler for `root`.
    ///
    /// The first entry becomes the outermost asset decorator; `timing`
    /// wraps the whole chain.
    pub fn handler(&self, root: &Path, timing: bool, observer: &SharedObserver) -> BoxHandler {
        let mut chain: BoxHandler = Box::new(StaticFiles::new(root));
        for entry in self.entries.iter().rev() {
            chain = Box::new(AssetHandler::new(
                Arc::clone(&entry.asset),
                Arc::clone(&entry.strategy),
                Arc::clone(observer),
                chain,
            ));
        }

        if timing {
            chain = Box::new(Timing::new(Arc::clone(observer), chain));
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::events::Recorder;
    use crate::handler::testing::{body, get, status};
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_from_config_keeps_order() {
        let config = test_parse_config(
            "[[asset]]\nsource = \"/srv/css\"\ndest = \"/srv/public\"\nuri = \"/site.css\"\n\n\
             [[asset]]\nstrategy = \"bundle\"\nsource = \"/srv/js\"\ndest = \"/srv/public\"\nuri = \"/app.js\"",
        );
        let pipeline = Pipeline::from_config(&config).unwrap();

        let names: Vec<_> = pipeline
            .entries()
            .iter()
            .map(|e| (e.asset.uri(), e.strategy.name()))
            .collect();
        assert_eq!(names, [("/site.css", "copy"), ("/app.js", "bundle")]);
    }

    #[test]
    fn test_from_config_invalid_pattern() {
        let config = test_parse_config(
            "[[asset]]\nsource = \"css\"\ndest = \"public\"\npattern = \"[\"\nuri = \"/a.css\"",
        );
        let err = Pipeline::from_config(&config).err().unwrap();
        assert!(format!("{err:#}").contains("invalid asset[0] (uri `/a.css`)"));
    }

    #[test]
    fn test_handler_chain_serves_built_assets() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("css")).unwrap();
        fs::create_dir_all(root.join("public")).unwrap();
        let source = root.join("css/site.css");
        fs::write(&source, "a{}").unwrap();
        File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(30))
            .unwrap();

        let mut config = test_parse_config(&format!(
            "[[asset]]\nsource = \"{}\"\npattern = \"site\\\\.css$\"\ndest = \"{}\"\nuri = \"/site.css\"",
            root.join("css").display(),
            root.join("public").display(),
        ));
        config.serve.root = root.join("public");
        let pipeline = Pipeline::from_config(&config).unwrap();

        let recorder = Recorder::shared();
        let observer: SharedObserver = recorder.clone();
        let chain = pipeline.handler(&config.serve.root, true, &observer);

        let response = get(&*chain, "/site.css");
        assert_eq!(status(&response), 200);
        assert_eq!(body(&response), "a{}");

        let events = recorder.events();
        assert_eq!(events.first().map(String::as_str), Some("[request] > /site.css"));
        assert!(events.iter().any(|e| e.contains("/site.css rebuilt by copy")));
        assert!(events.last().unwrap().starts_with("[request] < /site.css"));
    }
}
