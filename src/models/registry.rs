use super::{ClassifierFamily, FaceBackend, ModelLoader, ModelReadiness, ObjectBackend};
use crate::error::ModelError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

struct FamilySlot<T: ?Sized> {
    family: ClassifierFamily,
    started: AtomicBool,
    outcome: OnceCell<Result<Arc<T>, ModelError>>,
}

impl<T: ?Sized> FamilySlot<T> {
    fn new(family: ClassifierFamily) -> Self {
        Self {
            family,
            started: AtomicBool::new(false),
            outcome: OnceCell::new(),
        }
    }

    fn readiness(&self) -> ModelReadiness {
        match self.outcome.get() {
            Some(Ok(_)) => ModelReadiness::Ready,
            Some(Err(ModelError::LoadFailed { details, .. })) => {
                ModelReadiness::Failed(details.clone())
            }
            Some(Err(e)) => ModelReadiness::Failed(e.to_string()),
            None if self.started.load(Ordering::Acquire) => ModelReadiness::Loading,
            None => ModelReadiness::Unloaded,
        }
    }

    fn backend(&self) -> Option<Arc<T>> {
        match self.outcome.get() {
            Some(Ok(backend)) => Some(Arc::clone(backend)),
            _ => None,
        }
    }

    /// Run `load` unless a load already happened or is underway; concurrent
    /// callers wait for the single in-flight load.
    async fn load_with<F, Fut>(&self, load: F) -> Result<(), ModelError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>, ModelError>>,
    {
        if let Some(outcome) = self.outcome.get() {
            debug!("{} model already loaded", self.family);
            return match outcome {
                Ok(_) => Ok(()),
                Err(e) => Err(e.clone()),
            };
        }
        self.started.store(true, Ordering::Release);

        let family = self.family;
        let outcome = self
            .outcome
            .get_or_init(|| async move {
                info!("Loading {} model", family);
                match load().await {
                    Ok(backend) => {
                        info!("{} model ready", family);
                        Ok(backend)
                    }
                    Err(e) => {
                        error!("Failed to load {} model: {}", family, e);
                        Err(e)
                    }
                }
            })
            .await;

        match outcome {
            Ok(_) => Ok(()),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Owns the classifier backends for one engine instance.
///
/// Each family is loaded at most once; a failed load is final for that
/// family and does not affect the other.
pub struct ModelRegistry {
    loader: Arc<dyn ModelLoader>,
    object: FamilySlot<dyn ObjectBackend>,
    face: FamilySlot<dyn FaceBackend>,
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            object: FamilySlot::new(ClassifierFamily::Object),
            face: FamilySlot::new(ClassifierFamily::Face),
        }
    }

    /// Load the backend for `family`, waiting for an in-flight load if any
    pub async fn load(&self, family: ClassifierFamily) -> Result<(), ModelError> {
        let loader = Arc::clone(&self.loader);
        match family {
            ClassifierFamily::Object => {
                self.object
                    .load_with(|| async move { loader.load_object().await })
                    .await
            }
            ClassifierFamily::Face => {
                self.face
                    .load_with(|| async move { loader.load_face().await })
                    .await
            }
        }
    }

    pub fn readiness(&self, family: ClassifierFamily) -> ModelReadiness {
        match family {
            ClassifierFamily::Object => self.object.readiness(),
            ClassifierFamily::Face => self.face.readiness(),
        }
    }

    pub fn is_ready(&self, family: ClassifierFamily) -> bool {
        self.readiness(family).is_ready()
    }

    /// The object backend, only once it is ready
    pub fn object_backend(&self) -> Option<Arc<dyn ObjectBackend>> {
        self.object.backend()
    }

    /// The face backend, only once it is ready
    pub fn face_backend(&self) -> Option<Arc<dyn FaceBackend>> {
        self.face.backend()
    }
}
