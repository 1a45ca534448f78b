//! PortalDriver - abstract browser session used by the payment core.
//!
//! The core never talks to chromiumoxide directly; it goes through this
//! trait so the whole flow can run against [`MockDriver`] in tests.
//!
//! # Implementations
//!
//! - `ChromiumDriver` - real browser over CDP (`browser` feature)
//! - [`MockDriver`] - scripted windows and elements for unit testing

use crate::locator::{PortalSelectors, Selector};
use crate::result::{PayError, PayResult};
use crate::window::WindowHandle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of one element's interactable state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// CSS form of the selector that found the element
    pub selector: String,
    /// Rendered text
    pub text_content: Option<String>,
    /// Element has a non-empty box and is not hidden
    pub visible: bool,
    /// Element is not disabled
    pub enabled: bool,
}

impl ElementHandle {
    /// Visible, enabled element with no text
    #[must_use]
    pub fn new(selector: &Selector) -> Self {
        Self {
            selector: selector.to_css(),
            text_content: None,
            visible: true,
            enabled: true,
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Set visibility
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set enabled state
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if element is visible
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Visible and enabled, i.e. a click would land
    #[must_use]
    pub const fn is_clickable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// Screenshot data with metadata
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Wrap encoded PNG bytes, taking the dimensions from the image header
    pub fn from_png(data: Vec<u8>) -> PayResult<Self> {
        let (width, height) = {
            let reader = png::Decoder::new(std::io::Cursor::new(data.as_slice()))
                .read_info()
                .map_err(|e| PayError::driver(format!("screenshot is not a PNG: {e}")))?;
            let info = reader.info();
            (info.width, info.height)
        };
        Ok(Self::new(data, width, height))
    }

    /// Get the size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if screenshot is valid (has data)
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty() && self.width > 0 && self.height > 0
    }
}

/// Browser session operations the portal flow needs
#[async_trait]
pub trait PortalDriver: Send + Sync {
    /// Navigate the focused window to URL
    async fn navigate(&mut self, url: &str) -> PayResult<()>;

    /// Handle of the focused window
    async fn current_window(&self) -> PayResult<WindowHandle>;

    /// Handles of every open window
    async fn window_handles(&self) -> PayResult<Vec<WindowHandle>>;

    /// Move focus to a window
    async fn switch_to_window(&mut self, handle: &WindowHandle) -> PayResult<()>;

    /// Close the focused window; focus must be switched explicitly afterwards
    async fn close_window(&mut self) -> PayResult<()>;

    /// Query the focused window; `None` if nothing matches
    async fn query_selector(&self, selector: &Selector) -> PayResult<Option<ElementHandle>>;

    /// Click the first match
    async fn click(&mut self, selector: &Selector) -> PayResult<()>;

    /// Type text into the first match
    async fn type_text(&mut self, selector: &Selector, text: &str) -> PayResult<()>;

    /// Rendered text of the first match
    async fn text(&self, selector: &Selector) -> PayResult<String> {
        let element = self
            .query_selector(selector)
            .await?
            .ok_or_else(|| PayError::not_found(selector.to_css()))?;
        Ok(element.text_content.unwrap_or_default())
    }

    /// Whether this session can take screenshots at all
    fn supports_screenshots(&self) -> bool {
        true
    }

    /// Take screenshot of the focused window
    async fn screenshot(&self) -> PayResult<Screenshot>;

    /// End the browser session
    async fn quit(&mut self) -> PayResult<()>;
}

// ============================================================================
// Mock driver
// ============================================================================

/// What a scripted click does to the mock session
#[derive(Debug, Clone)]
pub enum MockEffect {
    /// Open a new window holding these elements (focus stays put)
    OpenWindow(Vec<ElementHandle>),
    /// Add or replace an element in the focused window
    Reveal(ElementHandle),
    /// Remove an element from the focused window
    Remove(String),
    /// Fail the click with a driver error
    Fail(String),
}

#[derive(Debug, Clone)]
struct MockWindow {
    handle: WindowHandle,
    elements: HashMap<String, ElementHandle>,
}

impl MockWindow {
    fn new(handle: WindowHandle) -> Self {
        Self {
            handle,
            elements: HashMap::new(),
        }
    }
}

/// Mock driver for unit testing
#[derive(Debug)]
pub struct MockDriver {
    windows: Vec<MockWindow>,
    focused: Option<WindowHandle>,
    effects: HashMap<String, Vec<MockEffect>>,
    screenshots_supported: bool,
    next_window: usize,
    /// Current URL
    pub current_url: String,
    /// Call history for verification
    pub call_history: Vec<String>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Handle of the window every mock session starts with
    pub const MAIN_WINDOW: &'static str = "main";

    /// Create a mock session with a single empty main window
    #[must_use]
    pub fn new() -> Self {
        let main = WindowHandle::new(Self::MAIN_WINDOW);
        Self {
            windows: vec![MockWindow::new(main.clone())],
            focused: Some(main),
            effects: HashMap::new(),
            screenshots_supported: true,
            next_window: 1,
            current_url: String::from("about:blank"),
            call_history: Vec::new(),
        }
    }

    /// Add an element to the focused window
    pub fn add_element(&mut self, element: ElementHandle) {
        if let Some(window) = self.focused_window_mut() {
            window.elements.insert(element.selector.clone(), element);
        }
    }

    /// Script what happens when `selector` is clicked
    pub fn on_click(&mut self, selector: &Selector, effect: MockEffect) {
        self.effects
            .entry(selector.to_css())
            .or_default()
            .push(effect);
    }

    /// Open an extra window directly, as if something outside the flow did it
    pub fn open_window(&mut self, elements: Vec<ElementHandle>) -> WindowHandle {
        let handle = WindowHandle::new(format!("window-{}", self.next_window));
        self.next_window += 1;
        let mut window = MockWindow::new(handle.clone());
        for element in elements {
            window.elements.insert(element.selector.clone(), element);
        }
        self.windows.push(window);
        handle
    }

    /// Toggle screenshot support
    pub fn set_screenshots_supported(&mut self, supported: bool) {
        self.screenshots_supported = supported;
    }

    /// Focused window handle, if any
    #[must_use]
    pub const fn focused(&self) -> Option<&WindowHandle> {
        self.focused.as_ref()
    }

    /// Handles of the windows still open
    #[must_use]
    pub fn open_windows(&self) -> Vec<WindowHandle> {
        self.windows.iter().map(|w| w.handle.clone()).collect()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    /// Number of clicks that landed on `selector`
    #[must_use]
    pub fn click_count(&self, selector: &Selector) -> usize {
        let entry = format!("click:{}", selector.to_css());
        self.call_history.iter().filter(|c| **c == entry).count()
    }

    fn focused_window(&self) -> PayResult<&MockWindow> {
        let focused = self
            .focused
            .as_ref()
            .ok_or_else(|| PayError::driver("no such window: focus was closed"))?;
        self.windows
            .iter()
            .find(|w| w.handle == *focused)
            .ok_or_else(|| PayError::driver(format!("no such window: {focused}")))
    }

    fn focused_window_mut(&mut self) -> Option<&mut MockWindow> {
        let focused = self.focused.clone()?;
        self.windows.iter_mut().find(|w| w.handle == focused)
    }

    fn apply(&mut self, effect: MockEffect) -> PayResult<()> {
        match effect {
            MockEffect::OpenWindow(elements) => {
                self.open_window(elements);
            }
            MockEffect::Reveal(element) => self.add_element(element),
            MockEffect::Remove(selector) => {
                if let Some(window) = self.focused_window_mut() {
                    window.elements.remove(&selector);
                }
            }
            MockEffect::Fail(message) => return Err(PayError::driver(message)),
        }
        Ok(())
    }
}

#[async_trait]
impl PortalDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> PayResult<()> {
        self.call_history.push(format!("navigate:{url}"));
        self.current_url = url.to_string();
        Ok(())
    }

    async fn current_window(&self) -> PayResult<WindowHandle> {
        Ok(self.focused_window()?.handle.clone())
    }

    async fn window_handles(&self) -> PayResult<Vec<WindowHandle>> {
        Ok(self.open_windows())
    }

    async fn switch_to_window(&mut self, handle: &WindowHandle) -> PayResult<()> {
        self.call_history.push(format!("switch:{handle}"));
        if !self.windows.iter().any(|w| w.handle == *handle) {
            return Err(PayError::driver(format!("no such window: {handle}")));
        }
        self.focused = Some(handle.clone());
        Ok(())
    }

    async fn close_window(&mut self) -> PayResult<()> {
        let handle = self.focused_window()?.handle.clone();
        self.call_history.push(format!("close:{handle}"));
        self.windows.retain(|w| w.handle != handle);
        self.focused = None;
        Ok(())
    }

    async fn query_selector(&self, selector: &Selector) -> PayResult<Option<ElementHandle>> {
        Ok(self
            .focused_window()?
            .elements
            .get(&selector.to_css())
            .cloned())
    }

    async fn click(&mut self, selector: &Selector) -> PayResult<()> {
        let css = selector.to_css();
        let clickable = self
            .focused_window()?
            .elements
            .get(&css)
            .is_some_and(ElementHandle::is_clickable);
        if !clickable {
            return Err(PayError::not_found(css));
        }
        self.call_history.push(format!("click:{css}"));
        for effect in self.effects.get(&css).cloned().unwrap_or_default() {
            self.apply(effect)?;
        }
        Ok(())
    }

    async fn type_text(&mut self, selector: &Selector, text: &str) -> PayResult<()> {
        let css = selector.to_css();
        let window = self
            .focused_window_mut()
            .ok_or_else(|| PayError::driver("no such window: focus was closed"))?;
        let element = window
            .elements
            .get_mut(&css)
            .ok_or_else(|| PayError::not_found(css.clone()))?;
        element.text_content = Some(text.to_string());
        // Record the field only; typed values may be secrets
        self.call_history.push(format!("type:{css}"));
        Ok(())
    }

    fn supports_screenshots(&self) -> bool {
        self.screenshots_supported
    }

    async fn screenshot(&self) -> PayResult<Screenshot> {
        if !self.screenshots_supported {
            return Err(PayError::driver("screenshots are not supported"));
        }
        let window = self.focused_window()?;
        // Not a real PNG: just the magic bytes followed by the window id
        let mut data = vec![0x89, 0x50, 0x4E, 0x47];
        data.extend_from_slice(window.handle.as_str().as_bytes());
        Ok(Screenshot::new(data, 800, 600))
    }

    async fn quit(&mut self) -> PayResult<()> {
        self.call_history.push("quit".to_string());
        self.windows.clear();
        self.focused = None;
        Ok(())
    }
}

/// Build a mock of the whole portal: dashboard, popup and express-pay pages.
///
/// `due_text` is shown in the due-amount tile (small variant) and
/// `pay_label` on the confirmation button once "Continue" is clicked.
#[must_use]
pub fn scripted_portal(selectors: &PortalSelectors, due_text: &str, pay_label: &str) -> MockDriver {
    let mut driver = MockDriver::new();

    driver.add_element(ElementHandle::new(&selectors.due_amount).with_text(due_text));
    if let Some(variant) = selectors.due_amount_variants.first() {
        driver.add_element(ElementHandle::new(variant).with_text(due_text));
    }
    driver.add_element(ElementHandle::new(&selectors.pay_my_bill));

    driver.on_click(
        &selectors.pay_my_bill,
        MockEffect::OpenWindow(vec![ElementHandle::new(&selectors.express_pay)]),
    );
    driver.on_click(
        &selectors.express_pay,
        MockEffect::Reveal(ElementHandle::new(&selectors.continue_button)),
    );
    driver.on_click(
        &selectors.continue_button,
        MockEffect::Reveal(ElementHandle::new(&selectors.payment_confirmation).with_text(pay_label)),
    );
    driver.on_click(
        &selectors.payment_confirmation,
        MockEffect::Reveal(ElementHandle::new(&selectors.close_session)),
    );

    driver
}
