use std::path::{Path, PathBuf};

use crate::api::{process, ShellCommand};
use crate::application::cache::{is_file, DiskCache};
use crate::application::Popups;
use crate::config::Config;
use crate::domain::{AppError, Result};
use crate::logging::Logger;
use crate::utils::shell_quote;

const DOTNET48_FILE: &str = "ndp48-x86-x64-allos-enu.exe";

/// Shell command marking a freshly downloaded script executable
const EXEC_PERMISSION_COMMAND: &str = "chmod +x";

/// Wrappers around winetricks, wine, pip and the installers they need
#[derive(Debug, Clone)]
pub struct ToolRunner {
    config: Config,
    popups: Popups,
    cache: DiskCache,
    exec_permission: String,
}

impl ToolRunner {
    pub fn new(config: Config, popups: Popups) -> Self {
        let cache = DiskCache::new(config.cache_dir(), popups.logger().clone());
        Self {
            config,
            popups,
            cache,
            exec_permission: EXEC_PERMISSION_COMMAND.to_string(),
        }
    }

    /// Replace the command run as `<command> <script>` to make winetricks executable
    pub fn with_exec_permission_command(mut self, command: impl Into<String>) -> Self {
        self.exec_permission = command.into();
        self
    }

    pub fn popups(&self) -> &Popups {
        &self.popups
    }

    fn logger(&self) -> &Logger {
        self.popups.logger()
    }

    /// `command` with proton's binaries first on PATH and WINEPREFIX pointing at the prefix
    fn in_prefix(&self, command: String, proton_bin: &Path) -> Result<ShellCommand> {
        let prefix = self.config.wineprefix()?;
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let search = std::env::join_paths(
            std::iter::once(proton_bin.to_path_buf()).chain(std::env::split_paths(&inherited)),
        )
        .map_err(|e| AppError::Config(format!("unusable proton bin path: {}", e)))?;

        Ok(ShellCommand::new(command)
            .env("PATH", search)
            .env("WINEPREFIX", prefix))
    }

    /// Run winetricks inside the prefix, fetching the script on first use.
    pub async fn winetricks(&self, command: &str, proton_bin: &Path) -> Result<i32> {
        let script = self.config.winetricks_path();
        let invocation =
            self.in_prefix(format!("{} {}", shell_quote(&script), command), proton_bin)?;

        if !is_file(&script).await {
            self.logger().log("winetricks not found. Downloading...");
            self.popups
                .downloader()
                .download(&self.config.endpoints.winetricks, &script, |_, _| {})
                .await?;

            self.logger()
                .log(format!("setting exec permissions on '{}'", script.display()));
            let code = process::run(
                format!("{} {}", self.exec_permission, shell_quote(&script)),
                self.logger(),
            )
            .await?;
            if code != 0 {
                let message = format!("failed to set exec permission on '{}'", script.display());
                return Err(self.popups.fatal("ERROR", &message).await);
            }
        }

        self.popups.execute("winetricks", invocation).await
    }

    /// Run `wine <command>` inside the prefix.
    pub async fn wine(&self, command: &str, proton_bin: &Path) -> Result<i32> {
        let invocation = self.in_prefix(format!("wine {}", command), proton_bin)?;
        self.popups.execute("wine", invocation).await
    }

    /// Run the pip bootstrap archive with `command`, logging its output.
    pub async fn pip(&self, command: &str) -> Result<i32> {
        let pip = self.config.pip_path();

        if !is_file(&pip).await {
            self.logger().log("pip not found. Downloading...");
            self.popups
                .downloader()
                .download(&self.config.endpoints.pip, &pip, |_, _| {})
                .await?;

            if !is_file(&pip).await {
                self.logger().log("CRITICAL: Failed to download pip. Exiting!");
                return Err(AppError::MissingDownload(pip));
            }
        }

        process::run(format!("python3 {} {}", shell_quote(&pip), command), self.logger()).await
    }

    /// Cached `name`, downloaded from `url` behind a progress popup on a miss.
    pub async fn download_cached(&self, title: &str, url: &str, name: &str) -> Result<PathBuf> {
        self.cache
            .get_or_populate(name, |path| async move {
                self.popups.download(title, url, &path).await.map(|_| ())
            })
            .await
    }

    /// Local path of the .NET Framework 4.8 offline installer
    pub async fn get_dotnet48(&self) -> Result<PathBuf> {
        self.download_cached(
            "Downloading dotnet48",
            &self.config.endpoints.dotnet48,
            DOTNET48_FILE,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use tokio::sync::mpsc;

    use super::*;
    use crate::api::Downloader;
    use crate::application::popups::tests::fake_host;
    use crate::logging::LogSink;
    use crate::ui::{PopupMessage, PopupView};

    fn runner(dir: &Path, server: &mockito::Server, tx: mpsc::UnboundedSender<crate::domain::Request>) -> ToolRunner {
        let mut config = Config::new(dir);
        config.compat_data_path = Some(dir.join("compatdata"));
        config.endpoints.pip = format!("{}/pip.pyz", server.url());
        config.endpoints.winetricks = format!("{}/winetricks", server.url());
        config.endpoints.dotnet48 = format!("{}/ndp48.exe", server.url());

        let logger = Logger::new(LogSink::File(dir.join("helper.log")));
        ToolRunner::new(config, Popups::new(tx, logger, Downloader::default()))
    }

    fn output_of(view: &PopupView) -> &str {
        match view {
            PopupView::Output(output) => &output.displayed,
            _ => panic!("expected output view"),
        }
    }

    #[tokio::test]
    async fn test_winetricks_fetched_once_and_run_in_prefix() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/winetricks")
            .with_status(200)
            .with_body("#!/bin/sh\necho \"winetricks $1 in $WINEPREFIX\"\n")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let host = tokio::spawn(fake_host(rx, |_, _| {}));
        let tools = runner(dir.path(), &server, tx);

        let first = tools.winetricks("corefonts", Path::new("/proton/bin")).await.unwrap();
        let second = tools.winetricks("vcrun2019", Path::new("/proton/bin")).await.unwrap();
        drop(tools);

        mock.assert_async().await;
        assert_eq!((first, second), (0, 0));

        let prefix = dir.path().join("compatdata").join("pfx");
        let closed = host.await.unwrap();
        assert_eq!(closed.len(), 2);
        assert_eq!(closed[0].title, "winetricks");
        assert_eq!(
            output_of(&closed[0].view),
            format!("winetricks corefonts in {}\n", prefix.display())
        );
        assert_eq!(
            output_of(&closed[1].view),
            format!("winetricks vcrun2019 in {}\n", prefix.display())
        );

        let log = std::fs::read_to_string(dir.path().join("helper.log")).unwrap();
        assert!(log.starts_with("winetricks not found. Downloading...\nsetting exec permissions on"));
    }

    #[tokio::test]
    async fn test_winetricks_refetched_after_broken_download() {
        let mut server = mockito::Server::new_async().await;
        let broken = server
            .mock("GET", "/winetricks")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"#!/bin/sh\necho par")?;
                Err(std::io::Error::other("connection dropped"))
            })
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let host = tokio::spawn(fake_host(rx, |_, _| {}));
        let tools = runner(dir.path(), &server, tx);

        let first = tools.winetricks("corefonts", Path::new("/proton/bin")).await;
        assert!(matches!(first, Err(AppError::Http(_))));
        assert!(!dir.path().join("winetricks").exists());

        broken.remove_async().await;
        let healthy = server
            .mock("GET", "/winetricks")
            .with_status(200)
            .with_body("#!/bin/sh\necho \"winetricks $1\"\n")
            .expect(1)
            .create_async()
            .await;

        let second = tools.winetricks("corefonts", Path::new("/proton/bin")).await.unwrap();
        drop(tools);

        healthy.assert_async().await;
        assert_eq!(second, 0);
        let closed = host.await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(output_of(&closed[0].view), "winetricks corefonts\n");
    }

    #[tokio::test]
    async fn test_winetricks_permission_failure_aborts() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/winetricks")
            .with_status(200)
            .with_body("#!/bin/sh\necho winetricks\n")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let host = tokio::spawn(fake_host(rx, |view, _| view.update(PopupMessage::Acknowledged)));
        let tools = runner(dir.path(), &server, tx).with_exec_permission_command("false");

        let result = tools.winetricks("corefonts", Path::new("/proton/bin")).await;
        drop(tools);

        let script = dir.path().join("winetricks");
        let expected = format!("failed to set exec permission on '{}'", script.display());
        assert!(matches!(result, Err(AppError::Aborted(ref message)) if *message == expected));

        let closed = host.await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].title, "ERROR");
        assert!(matches!(&closed[0].view, PopupView::Message(view) if view.message == expected));

        let log = std::fs::read_to_string(dir.path().join("helper.log")).unwrap();
        assert!(log.ends_with(&format!("{}\n", expected)));
    }

    #[tokio::test]
    async fn test_wine_uses_proton_bin_first() {
        let server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let wine = bin.join("wine");
        std::fs::write(&wine, "#!/bin/sh\necho \"proton wine $1\"\n").unwrap();
        std::fs::set_permissions(&wine, std::fs::Permissions::from_mode(0o755)).unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let host = tokio::spawn(fake_host(rx, |_, _| {}));
        let tools = runner(dir.path(), &server, tx);

        let code = tools.wine("--version", &bin).await.unwrap();
        drop(tools);

        let closed = host.await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(closed[0].title, "wine");
        assert_eq!(output_of(&closed[0].view), "proton wine --version\n");
    }

    #[tokio::test]
    async fn test_wine_without_prefix_is_config_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let tools = ToolRunner::new(
            Config::new("/opt/helper"),
            Popups::new(tx, Logger::null(), Downloader::default()),
        );

        let result = tools.wine("--version", Path::new("/proton/bin")).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_pip_bootstrap_is_fetched_when_missing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pip.pyz")
            .with_status(200)
            .with_body("print('pip 24.0')\n")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let tools = runner(dir.path(), &server, tx);

        tools.pip("--version").await.unwrap();

        mock.assert_async().await;
        assert!(dir.path().join("pip.pyz").is_file());
        let log = std::fs::read_to_string(dir.path().join("helper.log")).unwrap();
        assert!(log.starts_with("pip not found. Downloading...\n"));
    }

    #[tokio::test]
    async fn test_pip_download_failure_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/pip.pyz")
            .with_status(500)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let tools = runner(dir.path(), &server, tx);

        assert!(matches!(tools.pip("--version").await, Err(AppError::Http(_))));
    }

    #[tokio::test]
    async fn test_dotnet48_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ndp48.exe")
            .with_status(200)
            .with_body(vec![0x4du8; 9000])
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let host = tokio::spawn(fake_host(rx, |_, _| {}));
        let tools = runner(dir.path(), &server, tx);

        let first = tools.get_dotnet48().await.unwrap();
        let second = tools.get_dotnet48().await.unwrap();
        drop(tools);

        mock.assert_async().await;
        assert_eq!(first, second);
        assert_eq!(first, dir.path().join(".cache").join(DOTNET48_FILE));
        assert_eq!(std::fs::metadata(&first).unwrap().len(), 9000);

        let closed = host.await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].title, "Downloading dotnet48");
    }
}
