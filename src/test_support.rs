//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use camino::Utf8Path;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::backend::{
    BackendFuture, BucketBackend, BucketRequest, InstanceBackend, InstanceRequest,
    LoadBalancerBackend,
};
use crate::load_balancer::LoadBalancerRequest;

/// Error returned by the recording fakes when told to fail.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("simulated {0} failure")]
pub struct FakeFailure(pub String);

#[derive(Clone, Debug, Default)]
struct CallLog(Arc<StdMutex<Vec<String>>>);

impl CallLog {
    fn push(&self, call: String) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn snapshot(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn outcome<T>(fail: bool, operation: &str, value: T) -> Result<T, FakeFailure> {
    if fail {
        Err(FakeFailure(operation.to_owned()))
    } else {
        Ok(value)
    }
}

/// Instance backend that records calls and tracks created names.
#[derive(Clone, Debug, Default)]
pub struct RecordingInstances {
    calls: CallLog,
    running: Arc<StdMutex<Vec<String>>>,
    fail: bool,
}

impl RecordingInstances {
    /// Backend whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Calls recorded so far, as `"<operation> <args>"` strings.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.snapshot()
    }

    fn running(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InstanceBackend for RecordingInstances {
    type Error = FakeFailure;

    fn create_instance<'a>(
        &'a self,
        request: &'a InstanceRequest,
    ) -> BackendFuture<'a, String, Self::Error> {
        Box::pin(async move {
            self.calls.push(format!("create_instance {}", request.name));
            let name = outcome(self.fail, "create_instance", request.name.clone())?;
            self.running().push(name.clone());
            Ok(name)
        })
    }

    fn list_running<'a>(&'a self, zone: &'a str) -> BackendFuture<'a, Vec<String>, Self::Error> {
        Box::pin(async move {
            self.calls.push(format!("list_running {zone}"));
            outcome(self.fail, "list_running", self.running().clone())
        })
    }

    fn terminate_instance<'a>(
        &'a self,
        zone: &'a str,
        name: &'a str,
    ) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.calls.push(format!("terminate_instance {zone} {name}"));
            outcome(self.fail, "terminate_instance", ())?;
            self.running().retain(|running| running != name);
            Ok(())
        })
    }
}

/// Bucket backend that records calls and holds objects in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingBuckets {
    calls: CallLog,
    objects: Arc<StdMutex<Vec<String>>>,
    fail: bool,
}

impl RecordingBuckets {
    /// Backend whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Backend whose buckets already hold `objects`.
    #[must_use]
    pub fn with_objects(objects: &[&str]) -> Self {
        Self {
            objects: Arc::new(StdMutex::new(
                objects.iter().map(|name| (*name).to_owned()).collect(),
            )),
            ..Self::default()
        }
    }

    /// Calls recorded so far, as `"<operation> <args>"` strings.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.snapshot()
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BucketBackend for RecordingBuckets {
    type Error = FakeFailure;

    fn create_bucket<'a>(
        &'a self,
        request: &'a BucketRequest,
    ) -> BackendFuture<'a, String, Self::Error> {
        Box::pin(async move {
            self.calls.push(format!("create_bucket {}", request.name));
            outcome(self.fail, "create_bucket", request.name.clone())
        })
    }

    fn list_buckets(&self) -> BackendFuture<'_, Vec<String>, Self::Error> {
        Box::pin(async move {
            self.calls.push(String::from("list_buckets"));
            outcome(self.fail, "list_buckets", Vec::new())
        })
    }

    fn upload_file<'a>(
        &'a self,
        bucket: &'a str,
        source: &'a Utf8Path,
        destination: Option<&'a str>,
    ) -> BackendFuture<'a, String, Self::Error> {
        Box::pin(async move {
            let object = destination
                .map(str::to_owned)
                .or_else(|| source.file_name().map(str::to_owned))
                .unwrap_or_default();
            self.calls
                .push(format!("upload_file {bucket} {source} {object}"));
            let stored = outcome(self.fail, "upload_file", object)?;
            self.objects().push(stored.clone());
            Ok(stored)
        })
    }

    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
    ) -> BackendFuture<'a, Vec<String>, Self::Error> {
        Box::pin(async move {
            self.calls.push(format!("list_objects {bucket}"));
            outcome(self.fail, "list_objects", self.objects().clone())
        })
    }

    fn delete_object<'a>(
        &'a self,
        bucket: &'a str,
        object: &'a str,
    ) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.calls.push(format!("delete_object {bucket} {object}"));
            outcome(self.fail, "delete_object", ())?;
            self.objects().retain(|stored| stored != object);
            Ok(())
        })
    }

    fn delete_bucket<'a>(&'a self, bucket: &'a str) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.calls.push(format!("delete_bucket {bucket}"));
            if !self.objects().is_empty() {
                return Err(FakeFailure(String::from("delete_bucket on non-empty bucket")));
            }
            outcome(self.fail, "delete_bucket", ())
        })
    }
}

/// Load balancer backend that returns a fixed documentation address.
#[derive(Clone, Debug, Default)]
pub struct RecordingLoadBalancer {
    calls: CallLog,
    fail: bool,
}

impl RecordingLoadBalancer {
    /// Address returned by successful calls.
    pub const IP: &'static str = "203.0.113.10";

    /// Backend whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.snapshot()
    }
}

impl LoadBalancerBackend for RecordingLoadBalancer {
    type Error = FakeFailure;

    fn create_load_balancer<'a>(
        &'a self,
        request: &'a LoadBalancerRequest,
    ) -> BackendFuture<'a, String, Self::Error> {
        Box::pin(async move {
            self.calls.push(format!(
                "create_load_balancer {} {}",
                request.bucket_name, request.backend_bucket_name
            ));
            outcome(self.fail, "create_load_balancer", Self::IP.to_owned())
        })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets and removes environment variables while holding a global mutex.
    /// A `None` value removes the variable.
    pub async fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
