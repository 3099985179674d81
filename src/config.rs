#[cfg(feature = "bbva")]
use crate::importers::bbva::{BbvaConfig, BbvaImporter};
#[cfg(feature = "edenred")]
use crate::importers::edenred::{EdenredConfig, EdenredImporter};
#[cfg(feature = "myinvestor")]
use crate::importers::myinvestor::{MyInvestorConfig, MyInvestorImporter};
#[cfg(feature = "sparkasse")]
use crate::importers::{
    sparkasse_giro::{SparkasseGiroConfig, SparkasseGiroImporter},
    sparkasse_mastercard::{SparkasseMasterCardConfig, SparkasseMasterCardImporter},
};

use crate::error::{ImportError, Result};
use crate::ledger::Flag;
use crate::mapping::AccountMapper;
use crate::resolver::TransactionResolver;
use crate::Importer;
use homedir::get_my_home as my_home;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// encapsulation of the application configuration
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct ImporterConfig {
    #[serde(default)]
    pub importers: Vec<ImporterDefinition>,

    /// directory of the configuration file, relative mapping paths are resolved against it
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl ImporterConfig {
    pub fn path() -> Result<PathBuf> {
        let env_path = std::env::var("BEANCOUNT_IMPORT_CONFIG");
        match env_path {
            Ok(env) => PathBuf::from_str(&env).map_err(|_| ImportError::ConfigPath),
            Err(_) => match my_home() {
                Ok(Some(home)) => Ok(home.join(".config/beancount-import/config.toml")),
                _ => Err(ImportError::ConfigPath),
            },
        }
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str =
            std::fs::read_to_string(path).map_err(|_| ImportError::ConfigRead(path.to_path_buf()))?;
        let mut config = toml::from_str::<ImporterConfig>(&config_str)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        log::debug!(
            "{} importers configured in {}",
            config.importers.len(),
            path.display()
        );
        Ok(config)
    }

    /// Creates all configured importers. Mapping files are read here, so a missing
    /// or unsupported mapping file fails before any input file is touched.
    pub fn build_importers(&self) -> Result<Vec<Box<dyn Importer>>> {
        self.importers
            .iter()
            .map(|definition| definition.build(self.base_dir.as_deref()))
            .collect()
    }
}

/// One configured importer, selected by the `type` key.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImporterDefinition {
    #[cfg(feature = "sparkasse")]
    SparkasseGiro(SparkasseGiroConfig),
    #[cfg(feature = "sparkasse")]
    SparkasseMastercard(SparkasseMasterCardConfig),
    #[cfg(feature = "bbva")]
    Bbva(BbvaConfig),
    #[cfg(feature = "edenred")]
    Edenred(EdenredConfig),
    #[cfg(feature = "myinvestor")]
    Myinvestor(MyInvestorConfig),
}

impl ImporterDefinition {
    pub fn build(&self, base_dir: Option<&Path>) -> Result<Box<dyn Importer>> {
        let importer: Box<dyn Importer> = match self {
            #[cfg(feature = "sparkasse")]
            ImporterDefinition::SparkasseGiro(config) => {
                Box::new(SparkasseGiroImporter::new(config.clone(), base_dir)?)
            }
            #[cfg(feature = "sparkasse")]
            ImporterDefinition::SparkasseMastercard(config) => {
                Box::new(SparkasseMasterCardImporter::new(config.clone(), base_dir)?)
            }
            #[cfg(feature = "bbva")]
            ImporterDefinition::Bbva(config) => Box::new(BbvaImporter::new(config.clone(), base_dir)?),
            #[cfg(feature = "edenred")]
            ImporterDefinition::Edenred(config) => {
                Box::new(EdenredImporter::new(config.clone(), base_dir)?)
            }
            #[cfg(feature = "myinvestor")]
            ImporterDefinition::Myinvestor(config) => {
                Box::new(MyInvestorImporter::new(config.clone(), base_dir)?)
            }
        };
        Ok(importer)
    }
}

/// Settings every importer shares: the owning account and how its transactions are resolved.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AccountOptions {
    pub account: String,
    /// YAML or JSON file with payee/narration overrides
    pub mapping: Option<PathBuf>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub flag: Flag,
}

fn default_currency() -> String {
    "EUR".to_owned()
}

impl AccountOptions {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_owned(),
            mapping: None,
            currency: default_currency(),
            tags: BTreeSet::new(),
            flag: Flag::default(),
        }
    }

    pub fn mapping_path(&self, base_dir: Option<&Path>) -> Option<PathBuf> {
        self.mapping.as_ref().map(|mapping| match base_dir {
            Some(base_dir) if mapping.is_relative() => base_dir.join(mapping),
            _ => mapping.clone(),
        })
    }

    pub fn resolver(&self, base_dir: Option<&Path>) -> Result<TransactionResolver> {
        let mapper = AccountMapper::load(self.mapping_path(base_dir).as_deref())?;
        Ok(TransactionResolver::new(self.account.clone(), mapper)
            .with_tags(self.tags.clone())
            .with_flag(self.flag))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn config_from_toml_str() {
        let config_str = "
        [[importers]]
        type = \"sparkasse_giro\"
        iban = \"DE12345678901234567890\"
        account = \"Assets:DE:SpkCGW:Checking\"
        mapping = \"mapping.yaml\"

        [[importers]]
        type = \"bbva\"
        account_number = \"ES12345678901234567890\"
        account = \"Assets:ES:BBVA:Checking\"
        tags = [\"share-Example\"]
        flag = \"warning\"

        [[importers]]
        type = \"myinvestor\"
        account = \"Assets:ES:MyInvestor\"
        currency = \"USD\"
        ";
        let config = toml::from_str::<ImporterConfig>(config_str).expect("TOML parsing failed");
        assert_eq!(config.importers.len(), 3);

        match &config.importers[0] {
            ImporterDefinition::SparkasseGiro(giro) => {
                assert_eq!(giro.iban, "DE12345678901234567890");
                assert_eq!(giro.date_format, "%d.%m.%y");
                assert_eq!(giro.encoding, "ISO-8859-1");
                assert_eq!(giro.options.account, "Assets:DE:SpkCGW:Checking");
                assert_eq!(giro.options.currency, "EUR");
                assert_eq!(giro.options.mapping, Some(PathBuf::from("mapping.yaml")));
                assert_eq!(giro.options.flag, Flag::Okay);
            }
            other => panic!("unexpected importer {:?}", other),
        }

        match &config.importers[1] {
            ImporterDefinition::Bbva(bbva) => {
                assert_eq!(bbva.account_number, "ES12345678901234567890");
                assert_eq!(
                    bbva.options.tags,
                    BTreeSet::from(["share-Example".to_owned()])
                );
                assert_eq!(bbva.options.flag, Flag::Warning);
            }
            other => panic!("unexpected importer {:?}", other),
        }

        match &config.importers[2] {
            ImporterDefinition::Myinvestor(myinvestor) => {
                assert_eq!(myinvestor.options.currency, "USD");
                assert_eq!(myinvestor.options.mapping, None);
            }
            other => panic!("unexpected importer {:?}", other),
        }
    }

    #[test]
    fn unknown_importer_type() {
        let config_str = "
        [[importers]]
        type = \"revolut\"
        account = \"Assets:Revolut\"
        ";
        assert!(toml::from_str::<ImporterConfig>(config_str).is_err());
    }

    #[test]
    fn relative_mapping_path() {
        let mut options = AccountOptions::new("Assets:Bank");
        assert_eq!(options.mapping_path(Some(Path::new("/etc/beancount"))), None);

        options.mapping = Some(PathBuf::from("mapping.yaml"));
        assert_eq!(
            options.mapping_path(Some(Path::new("/etc/beancount"))),
            Some(PathBuf::from("/etc/beancount/mapping.yaml"))
        );
        assert_eq!(options.mapping_path(None), Some(PathBuf::from("mapping.yaml")));

        options.mapping = Some(PathBuf::from("/srv/mapping.json"));
        assert_eq!(
            options.mapping_path(Some(Path::new("/etc/beancount"))),
            Some(PathBuf::from("/srv/mapping.json"))
        );
    }

    #[test]
    fn missing_mapping_fails_at_construction() {
        let mut options = AccountOptions::new("Assets:Bank");
        options.mapping = Some(PathBuf::from("/does/not/exist.yaml"));
        assert!(matches!(
            options.resolver(None),
            Err(ImportError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("creating temp dir failed");
        let mapping = dir.path().join("mapping.json");
        std::fs::write(&mapping, r#"{ "ACME": { "account": "Expenses:Shopping" } }"#).unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "[[importers]]
type = \"sparkasse_mastercard\"
last_four_digits = \"4932\"
account = \"Liabilities:DE:MasterCard\"
mapping = \"mapping.json\"
",
        )
        .unwrap();

        let config = ImporterConfig::load_from(&config_path).expect("loading config failed");
        assert_eq!(config.base_dir.as_deref(), Some(dir.path()));

        let importers = config.build_importers().expect("building importers failed");
        assert_eq!(importers.len(), 1);
        assert_eq!(importers[0].account(), "Liabilities:DE:MasterCard");
        assert_eq!(importers[0].name(), "Sparkasse MasterCard");
    }

    #[test]
    fn unreadable_config() {
        let result = ImporterConfig::load_from(Path::new("/does/not/exist.toml"));
        assert!(matches!(result, Err(ImportError::ConfigRead(_))));
    }
}
