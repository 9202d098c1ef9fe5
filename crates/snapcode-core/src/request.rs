//! Generation request model

use std::fmt;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ACCEPTED_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Uploaded design image
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Result<Self> {
        let mime_type = mime_type.into().to_lowercase();
        if !ACCEPTED_IMAGE_TYPES.contains(&mime_type.as_str()) {
            return Err(CoreError::Image(format!("unsupported type {}", mime_type)));
        }
        if bytes.is_empty() {
            return Err(CoreError::Image("empty image".to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(CoreError::Image(format!(
                "{} bytes exceeds the {} MB limit",
                bytes.len(),
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }
        Ok(Self { bytes, mime_type })
    }

    /// Read an image file; the MIME type comes from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let mime = match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => return Err(CoreError::Image(format!("unsupported file extension '{}'", ext))),
        };
        let bytes = std::fs::read(path)
            .map_err(|e| CoreError::Image(format!("{}: {}", path.display(), e)))?;
        Self::new(bytes, mime)
    }

    /// Parse a `data:<mime>;base64,<data>` URL.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| CoreError::Image("not a data URL".to_string()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| CoreError::Image("data URL has no payload".to_string()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| CoreError::Image("data URL is not base64".to_string()))?;
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| CoreError::Image(format!("bad base64: {}", e)))?;
        Self::new(bytes, mime)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComponentCategory {
    Menu,
    #[default]
    Section,
    Footer,
    Cart,
    Hero,
    FullPage,
}

impl ComponentCategory {
    pub const ALL: [ComponentCategory; 6] = [
        ComponentCategory::Menu,
        ComponentCategory::Section,
        ComponentCategory::Footer,
        ComponentCategory::Cart,
        ComponentCategory::Hero,
        ComponentCategory::FullPage,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ComponentCategory::Menu => "Menu",
            ComponentCategory::Section => "Section",
            ComponentCategory::Footer => "Footer",
            ComponentCategory::Cart => "Cart",
            ComponentCategory::Hero => "Hero",
            ComponentCategory::FullPage => "Full Page",
        }
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ComponentCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.label().replace(' ', "").to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown component '{}'", s))
    }
}

/// Page structure the output should follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateStyle {
    DefaultTailwind,
    ModernLandingPage,
    EcommerceProductCard,
    DashboardLayout,
    MinimalPortfolio,
}

impl TemplateStyle {
    pub const ALL: [TemplateStyle; 5] = [
        TemplateStyle::DefaultTailwind,
        TemplateStyle::ModernLandingPage,
        TemplateStyle::EcommerceProductCard,
        TemplateStyle::DashboardLayout,
        TemplateStyle::MinimalPortfolio,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TemplateStyle::DefaultTailwind => "Default Tailwind Structure",
            TemplateStyle::ModernLandingPage => "Modern Landing Page",
            TemplateStyle::EcommerceProductCard => "E-commerce Product Card",
            TemplateStyle::DashboardLayout => "Dashboard Layout",
            TemplateStyle::MinimalPortfolio => "Minimal Portfolio",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            TemplateStyle::DefaultTailwind => "default",
            TemplateStyle::ModernLandingPage => "landing",
            TemplateStyle::EcommerceProductCard => "product-card",
            TemplateStyle::DashboardLayout => "dashboard",
            TemplateStyle::MinimalPortfolio => "portfolio",
        }
    }
}

impl std::str::FromStr for TemplateStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.slug() == wanted || t.label().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown template '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedOptions {
    pub responsive: bool,
    pub performance_optimized: bool,
    pub accessible: bool,
    pub include_javascript: bool,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            responsive: true,
            performance_optimized: true,
            accessible: false,
            include_javascript: false,
        }
    }
}

/// One generation call's worth of input. Immutable once built.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    image: ImagePayload,
    custom_instructions: Option<String>,
    category: ComponentCategory,
    template: Option<TemplateStyle>,
    options: AdvancedOptions,
}

impl GenerationRequest {
    pub fn new(image: ImagePayload, category: ComponentCategory, options: AdvancedOptions) -> Self {
        Self {
            image,
            custom_instructions: None,
            category,
            template: None,
            options,
        }
    }

    /// Attach free-text instructions. Blank text is dropped.
    pub fn with_instructions(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        self.custom_instructions = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn with_template(mut self, template: TemplateStyle) -> Self {
        self.template = Some(template);
        self
    }

    pub fn image(&self) -> &ImagePayload {
        &self.image
    }

    pub fn custom_instructions(&self) -> Option<&str> {
        self.custom_instructions.as_deref()
    }

    pub fn category(&self) -> ComponentCategory {
        self.category
    }

    pub fn template(&self) -> Option<TemplateStyle> {
        self.template
    }

    pub fn options(&self) -> AdvancedOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_image_limits() {
        assert!(ImagePayload::new(vec![1, 2, 3], "image/PNG").is_ok());
        assert!(ImagePayload::new(vec![1], "image/bmp").is_err());
        assert!(ImagePayload::new(vec![], "image/png").is_err());
        assert!(ImagePayload::new(vec![0; MAX_IMAGE_BYTES + 1], "image/png").is_err());
    }

    #[test]
    fn test_from_data_url() {
        let img = ImagePayload::from_data_url("data:image/png;base64,AQID").unwrap();
        assert_eq!(img.bytes, vec![1, 2, 3]);
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(img.to_base64(), "AQID");

        assert!(ImagePayload::from_data_url("AQID").is_err());
        assert!(ImagePayload::from_data_url("data:image/png,AQID").is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::Builder::new().suffix(".JPG").tempfile().unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF]).unwrap();

        let img = ImagePayload::from_path(file.path()).unwrap();
        assert_eq!(img.mime_type, "image/jpeg");
        assert_eq!(img.bytes.len(), 3);

        let txt = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(ImagePayload::from_path(txt.path()).is_err());
    }

    #[test]
    fn test_debug_omits_bytes() {
        let img = ImagePayload::new(vec![7; 64], "image/gif").unwrap();
        let printed = format!("{:?}", img);
        assert!(printed.contains("len: 64"));
        assert!(!printed.contains("7, 7"));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("hero".parse::<ComponentCategory>().unwrap(), ComponentCategory::Hero);
        assert_eq!("full-page".parse::<ComponentCategory>().unwrap(), ComponentCategory::FullPage);
        assert_eq!("Full Page".parse::<ComponentCategory>().unwrap(), ComponentCategory::FullPage);
        assert!("sidebar".parse::<ComponentCategory>().is_err());
        assert_eq!(ComponentCategory::default(), ComponentCategory::Section);
    }

    #[test]
    fn test_template_parse() {
        assert_eq!("dashboard".parse::<TemplateStyle>().unwrap(), TemplateStyle::DashboardLayout);
        assert_eq!(
            "Modern Landing Page".parse::<TemplateStyle>().unwrap(),
            TemplateStyle::ModernLandingPage
        );
        assert!("brutalist".parse::<TemplateStyle>().is_err());
    }

    #[test]
    fn test_blank_instructions_dropped() {
        let img = ImagePayload::new(vec![1], "image/png").unwrap();
        let req = GenerationRequest::new(img.clone(), ComponentCategory::Menu, AdvancedOptions::default())
            .with_instructions("   ");
        assert_eq!(req.custom_instructions(), None);

        let req = GenerationRequest::new(img, ComponentCategory::Menu, AdvancedOptions::default())
            .with_instructions("  dark theme ");
        assert_eq!(req.custom_instructions(), Some("dark theme"));
    }

    #[test]
    fn test_default_options() {
        let o = AdvancedOptions::default();
        assert!(o.responsive && o.performance_optimized);
        assert!(!o.accessible && !o.include_javascript);
    }
}
