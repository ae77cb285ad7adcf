//! Display filtering: stored markup in, reader markup out, with hooks on either side of
//! the storage to display conversion.

use crate::converter::Converter;
use crate::error::Result;

pub trait FilterHook {
    fn name(&self) -> &str;

    /// Adjust stored markup before markers are rendered.
    fn before(&self, html: &str) -> Result<String> {
        Ok(html.to_string())
    }

    /// Adjust display markup after markers are rendered.
    fn after(&self, html: &str) -> Result<String> {
        Ok(html.to_string())
    }
}

pub struct HookRegistry {
    hooks: Vec<Box<dyn FilterHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn register(&mut self, hook: Box<dyn FilterHook>) {
        self.hooks.push(hook);
    }

    pub fn hooks(&self) -> &[Box<dyn FilterHook>] {
        &self.hooks
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DisplayFilter<'a> {
    converter: Converter<'a>,
    hooks: &'a HookRegistry,
}

impl<'a> DisplayFilter<'a> {
    pub fn new(converter: Converter<'a>, hooks: &'a HookRegistry) -> Self {
        Self { converter, hooks }
    }

    pub fn process(&self, html: &str) -> Result<String> {
        let mut html = html.to_string();
        for hook in self.hooks.hooks() {
            log::debug!("Running before-hook {}", hook.name());
            html = hook.before(&html)?;
        }

        let mut html = self.converter.storage_to_display(&html)?.markup;

        for hook in self.hooks.hooks() {
            log::debug!("Running after-hook {}", hook.name());
            html = hook.after(&html)?;
        }
        Ok(html)
    }
}
