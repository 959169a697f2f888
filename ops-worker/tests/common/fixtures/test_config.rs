//! Test configuration builder for creating config directories programmatically

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Builder for a `config/` directory: main.toml, host files, secrets.toml
pub struct TestConfigBuilder {
    temp_dir: TempDir,
    main_toml: String,
    host_files: Vec<(String, Vec<HostEntryBuilder>)>,
    secrets: Vec<(String, String, String)>,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            main_toml: "host = \"127.0.0.1\"\nport = 8081\n".to_string(),
            host_files: Vec::new(),
            secrets: Vec::new(),
        }
    }

    /// Replace main.toml verbatim
    pub fn with_main_toml(mut self, content: &str) -> Self {
        self.main_toml = content.to_string();
        self
    }

    /// Add a host file holding the given `[[hosts]]` entries
    pub fn with_host_file<F>(mut self, file_name: &str, f: F) -> Self
    where
        F: FnOnce(Vec<HostEntryBuilder>) -> Vec<HostEntryBuilder>,
    {
        let hosts = f(Vec::new());
        self.host_files.push((file_name.to_string(), hosts));
        self
    }

    pub fn with_secret(mut self, host: &str, username: &str, password: &str) -> Self {
        self.secrets
            .push((host.to_string(), username.to_string(), password.to_string()));
        self
    }

    /// Write everything to the temp directory
    pub fn build(self) -> TestConfig {
        let config_dir = self.temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        fs::write(config_dir.join("main.toml"), &self.main_toml).expect("Failed to write main.toml");

        for (file_name, hosts) in &self.host_files {
            let content: String = hosts.iter().map(HostEntryBuilder::render).collect();
            fs::write(config_dir.join(file_name), content).expect("Failed to write host file");
        }

        if !self.secrets.is_empty() {
            let mut content = String::new();
            for (host, username, password) in &self.secrets {
                content.push_str(&format!(
                    "[credentials.{}]\nusername = \"{}\"\npassword = \"{}\"\n\n",
                    host, username, password
                ));
            }
            fs::write(config_dir.join("secrets.toml"), content).expect("Failed to write secrets.toml");
        }

        TestConfig {
            _temp_dir: self.temp_dir,
            config_dir,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Written configuration; the directory lives as long as this value
pub struct TestConfig {
    _temp_dir: TempDir,
    pub config_dir: PathBuf,
}

impl TestConfig {
    pub fn dir(&self) -> String {
        self.config_dir.to_string_lossy().into_owned()
    }
}

/// One `[[hosts]]` table
#[derive(Clone, Default)]
pub struct HostEntryBuilder {
    fields: Vec<(String, String)>,
}

impl HostEntryBuilder {
    pub fn new(name: &str, address: &str) -> Self {
        Self::default().text("name", name).text("address", address)
    }

    pub fn text(mut self, key: &str, value: &str) -> Self {
        self.fields
            .push((key.to_string(), format!("'{}'", value)));
        self
    }

    pub fn number(mut self, key: &str, value: i64) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn flag(mut self, key: &str, value: bool) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    /// The entry as a `[[hosts]]` TOML table
    pub fn render(&self) -> String {
        let mut toml = String::from("[[hosts]]\n");
        for (key, value) in &self.fields {
            toml.push_str(&format!("{} = {}\n", key, value));
        }
        toml.push('\n');
        toml
    }
}
