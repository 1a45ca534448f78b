//! Browser control over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature, [`ChromiumDriver`] launches Chromium through
//! chromiumoxide and implements [`PortalDriver`](crate::driver::PortalDriver).
//! Each CDP page target is one window; its target id is the window handle.

use serde::{Deserialize, Serialize};

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 1024,
            chromium_path: None,
            user_agent: None,
            sandbox: false,
        }
    }
}

impl BrowserConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening)]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{ElementHandle, PortalDriver, Screenshot};
    use crate::locator::Selector;
    use crate::result::{PayError, PayResult};
    use crate::window::WindowHandle;
    use async_trait::async_trait;
    use base64::Engine;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde::Deserialize;
    use tokio::sync::Mutex;

    /// What the element state script reports
    #[derive(Debug, Deserialize)]
    struct ElementState {
        found: bool,
        text: Option<String>,
        visible: bool,
        enabled: bool,
    }

    fn element_state_script(selector: &Selector) -> String {
        format!(
            "(() => {{ \
               const el = {query}; \
               if (!el) {{ return {{ found: false, text: null, visible: false, enabled: false }}; }} \
               const style = window.getComputedStyle(el); \
               const rect = el.getBoundingClientRect(); \
               const visible = rect.width > 0 && rect.height > 0 \
                 && style.visibility !== 'hidden' && style.display !== 'none'; \
               const enabled = !el.disabled && el.getAttribute('aria-disabled') !== 'true'; \
               return {{ found: true, text: el.innerText, visible, enabled }}; \
             }})()",
            query = selector.to_query()
        )
    }

    fn handle_of(page: &CdpPage) -> WindowHandle {
        WindowHandle::new(page.target_id().inner().clone())
    }

    /// Chromium session driven over CDP
    #[derive(Debug)]
    pub struct ChromiumDriver {
        config: BrowserConfig,
        browser: Mutex<CdpBrowser>,
        current: Option<CdpPage>,
        handler: tokio::task::JoinHandle<()>,
    }

    impl ChromiumDriver {
        /// Launch Chromium and open a blank main window
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> PayResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            if let Some(ref ua) = config.user_agent {
                builder = builder.arg(format!("--user-agent={ua}"));
            }

            let cdp_config = builder.build().map_err(PayError::driver)?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| PayError::driver(format!("failed to launch browser: {e}")))?;

            // Spawn handler task
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| PayError::driver(e.to_string()))?;
            tracing::debug!(window = %handle_of(&page), headless = config.headless, "browser launched");

            Ok(Self {
                config,
                browser: Mutex::new(browser),
                current: Some(page),
                handler,
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        fn page(&self) -> PayResult<&CdpPage> {
            self.current
                .as_ref()
                .ok_or_else(|| PayError::driver("no such window: focus was closed"))
        }

        async fn pages(&self) -> PayResult<Vec<CdpPage>> {
            let browser = self.browser.lock().await;
            browser
                .pages()
                .await
                .map_err(|e| PayError::driver(e.to_string()))
        }

        async fn element_state(&self, selector: &Selector) -> PayResult<ElementState> {
            self.page()?
                .evaluate(element_state_script(selector))
                .await
                .map_err(|e| PayError::driver(e.to_string()))?
                .into_value()
                .map_err(|e| PayError::driver(e.to_string()))
        }
    }

    #[async_trait]
    impl PortalDriver for ChromiumDriver {
        async fn navigate(&mut self, url: &str) -> PayResult<()> {
            self.page()?
                .goto(url)
                .await
                .map_err(|e| PayError::driver(format!("navigation to {url} failed: {e}")))?;
            Ok(())
        }

        async fn current_window(&self) -> PayResult<WindowHandle> {
            Ok(handle_of(self.page()?))
        }

        async fn window_handles(&self) -> PayResult<Vec<WindowHandle>> {
            Ok(self.pages().await?.iter().map(handle_of).collect())
        }

        async fn switch_to_window(&mut self, handle: &WindowHandle) -> PayResult<()> {
            let page = self
                .pages()
                .await?
                .into_iter()
                .find(|page| handle_of(page) == *handle)
                .ok_or_else(|| PayError::driver(format!("no such window: {handle}")))?;
            page.bring_to_front()
                .await
                .map_err(|e| PayError::driver(e.to_string()))?;
            self.current = Some(page);
            Ok(())
        }

        async fn close_window(&mut self) -> PayResult<()> {
            let page = self
                .current
                .take()
                .ok_or_else(|| PayError::driver("no such window: focus was closed"))?;
            page.close()
                .await
                .map_err(|e| PayError::driver(e.to_string()))
        }

        async fn query_selector(&self, selector: &Selector) -> PayResult<Option<ElementHandle>> {
            let state = self.element_state(selector).await?;
            if !state.found {
                return Ok(None);
            }
            let mut element = ElementHandle::new(selector)
                .with_visible(state.visible)
                .with_enabled(state.enabled);
            element.text_content = state.text;
            Ok(Some(element))
        }

        async fn click(&mut self, selector: &Selector) -> PayResult<()> {
            let css = selector.to_css();
            let element = self
                .page()?
                .find_element(css.as_str())
                .await
                .map_err(|_| PayError::not_found(css.clone()))?;
            element
                .click()
                .await
                .map_err(|e| PayError::driver(format!("click on {css} failed: {e}")))?;
            Ok(())
        }

        async fn type_text(&mut self, selector: &Selector, text: &str) -> PayResult<()> {
            let css = selector.to_css();
            let element = self
                .page()?
                .find_element(css.as_str())
                .await
                .map_err(|_| PayError::not_found(css.clone()))?;
            element
                .click()
                .await
                .map_err(|e| PayError::driver(e.to_string()))?
                .type_str(text)
                .await
                .map_err(|e| PayError::driver(format!("typing into {css} failed: {e}")))?;
            Ok(())
        }

        async fn screenshot(&self) -> PayResult<Screenshot> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();

            let screenshot = self
                .page()?
                .execute(params)
                .await
                .map_err(|e| PayError::driver(format!("screenshot failed: {e}")))?;

            let data = base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| PayError::driver(format!("screenshot decode failed: {e}")))?;
            Screenshot::from_png(data)
        }

        async fn quit(&mut self) -> PayResult<()> {
            self.current = None;
            let result = {
                let mut browser = self.browser.lock().await;
                browser.close().await.map(|_| ())
            };
            self.handler.abort();
            result.map_err(|e| PayError::driver(format!("failed to close browser: {e}")))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_element_state_script_embeds_query() {
            let script = element_state_script(&Selector::id("logoutCloseWindowBtn"));
            assert!(script.contains(r#"document.querySelector("[id=\"logoutCloseWindowBtn\"]")"#));
            assert!(script.starts_with("(() =>"));
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_unattended_runs() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert!(!config.sandbox);
        assert!(config.chromium_path.is_none());
    }

    #[test]
    fn test_builder() {
        let config = BrowserConfig::default()
            .with_headless(false)
            .with_chromium_path("/usr/bin/chromium");
        assert!(!config.headless);
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        assert!(!config.sandbox);
    }

    #[test]
    fn test_yaml_partial() {
        let config: BrowserConfig = serde_yaml_ng::from_str("headless: false").unwrap();
        assert!(!config.headless);
        assert_eq!(config.viewport_width, 1280);
    }
}
