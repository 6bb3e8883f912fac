//! Locale negotiation: pick the first locale whose storage reports a build

use super::{ArchiveStorage, Locale, StorageProvider};
use crate::error::{Error, Result};

/// Storage adopted for the whole run
#[derive(Debug)]
pub struct NegotiatedStorage<S> {
    pub locale: Locale,
    pub build: u32,
    pub storage: S,
}

/// Probes installed locales in client order
#[derive(Debug)]
pub struct StorageNegotiator<'a, P> {
    provider: &'a P,
}

impl<'a, P: StorageProvider> StorageNegotiator<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Open storage for the first installed locale with a non-zero build number
    pub fn negotiate(&self) -> Result<NegotiatedStorage<P::Storage>> {
        let installed = self.provider.installed_locales()?;
        log::debug!("Installed locales mask: {:#x}", installed.bits());

        for locale in Locale::ALL {
            if locale == Locale::None {
                continue;
            }

            let flags = locale.storage_flags();
            if !installed.intersects(flags) {
                continue;
            }

            let storage = match self.provider.open(flags) {
                Ok(Some(storage)) => storage,
                Ok(None) => {
                    log::warn!("Error opening storage for locale {locale}");
                    continue;
                }
                Err(e) => {
                    log::warn!("Error opening storage for locale {locale}: {e}");
                    continue;
                }
            };

            let build = storage.build_number();
            if build == 0 {
                log::debug!("Storage for locale {locale} reports no build, skipping");
                continue;
            }

            log::info!("Detected client build {build} for locale {locale}");
            return Ok(NegotiatedStorage {
                locale,
                build,
                storage,
            });
        }

        Err(Error::NoUsableLocale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocaleMask;
    use crate::test_utils::{MemoryProvider, MemoryStorage};

    #[test]
    fn test_first_usable_locale_wins() {
        let provider = MemoryProvider::new(LocaleMask::FRFR | LocaleMask::DEDE)
            .with_storage(LocaleMask::FRFR, MemoryStorage::new(26972))
            .with_storage(LocaleMask::DEDE, MemoryStorage::new(26973));

        let negotiated = StorageNegotiator::new(&provider).negotiate().unwrap();
        assert_eq!(negotiated.locale, Locale::FrFr);
        assert_eq!(negotiated.build, 26972);
    }

    #[test]
    fn test_zero_build_is_skipped() {
        let provider = MemoryProvider::new(LocaleMask::ENGB | LocaleMask::KOKR)
            .with_storage(LocaleMask::ENUS | LocaleMask::ENGB, MemoryStorage::new(0))
            .with_storage(LocaleMask::KOKR, MemoryStorage::new(12340));

        let negotiated = StorageNegotiator::new(&provider).negotiate().unwrap();
        assert_eq!(negotiated.locale, Locale::KoKr);
    }

    #[test]
    fn test_uninstalled_locales_are_not_opened() {
        let provider = MemoryProvider::new(LocaleMask::ITIT)
            .with_storage(LocaleMask::ENUS | LocaleMask::ENGB, MemoryStorage::new(1))
            .with_storage(LocaleMask::ITIT, MemoryStorage::new(2));

        let negotiated = StorageNegotiator::new(&provider).negotiate().unwrap();
        assert_eq!(negotiated.locale, Locale::ItIt);
        assert_eq!(provider.open_calls(), 1);
    }

    #[test]
    fn test_no_usable_locale() {
        let provider = MemoryProvider::new(LocaleMask::RURU);
        assert!(matches!(
            StorageNegotiator::new(&provider).negotiate(),
            Err(Error::NoUsableLocale)
        ));
    }
}
