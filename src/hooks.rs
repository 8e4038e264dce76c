use std::{
    fmt,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::{DateTime, Utc};
use serde::Serialize;

// --- Hook Bus ---

/// Identifier returned by `bind_func`, used to unbind a handler later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

type HandlerFn<E> = dyn Fn(&mut E) -> anyhow::Result<()> + Send + Sync;

struct Handler<E> {
    id: HandlerId,
    tags: Vec<String>,
    func: Arc<HandlerFn<E>>,
}

/// Events that carry origin tags, matched against tagged subscriptions.
pub trait Tagged {
    fn tags(&self) -> &[String];
}

/// Hook
///
/// An ordered list of handlers for one lifecycle moment. Handlers run in bind order and
/// the first error stops the chain.
pub struct Hook<E> {
    handlers: RwLock<Vec<Handler<E>>>,
}

impl<E> Default for Hook<E> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }
}

impl<E> fmt::Debug for Hook<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").field("handlers", &self.len()).finish()
    }
}

impl<E> Hook<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler that fires for every event.
    pub fn bind_func<F>(&self, func: F) -> HandlerId
    where
        F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bind_tagged(Vec::new(), func)
    }

    fn bind_tagged<F>(&self, tags: Vec<String>, func: F) -> HandlerId
    where
        F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = HandlerId(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Handler {
                id,
                tags,
                func: Arc::new(func),
            });
        id
    }

    /// Removes a handler. Returns `false` when the id is unknown.
    pub fn unbind(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|handler| handler.id != id);
        handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every handler in bind order, ignoring subscription tags.
    pub fn trigger(&self, event: &mut E) -> anyhow::Result<()> {
        self.run(event, |_| true)
    }

    // Handlers are snapshotted so a handler may bind or unbind on this same hook.
    fn run(&self, event: &mut E, accepts: impl Fn(&[String]) -> bool) -> anyhow::Result<()> {
        let funcs: Vec<Arc<HandlerFn<E>>> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|handler| accepts(&handler.tags))
            .map(|handler| Arc::clone(&handler.func))
            .collect();

        for func in funcs {
            func(event)?;
        }
        Ok(())
    }
}

impl<E: Tagged> Hook<E> {
    /// Runs the handlers whose subscription tags intersect the event's tags. Untagged
    /// subscriptions always run.
    pub fn trigger_tagged(&self, event: &mut E) -> anyhow::Result<()> {
        let origin: Vec<String> = event.tags().to_vec();
        self.run(event, |tags| {
            tags.is_empty() || tags.iter().any(|tag| origin.contains(tag))
        })
    }
}

/// TaggedHook
///
/// A hook seen through a subscription tag set. Handlers bound here only fire for events
/// whose origin tags intersect `tags`; an empty set subscribes to everything.
pub struct TaggedHook<'a, E> {
    hook: &'a Hook<E>,
    tags: Vec<String>,
}

impl<'a, E> TaggedHook<'a, E> {
    pub fn new(hook: &'a Hook<E>, tags: &[&str]) -> Self {
        Self {
            hook,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn bind_func<F>(&self, func: F) -> HandlerId
    where
        F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hook.bind_tagged(self.tags.clone(), func)
    }

    pub fn unbind(&self, id: HandlerId) -> bool {
        self.hook.unbind(id)
    }
}

// --- Hook Events ---

/// HookEvent
///
/// Payload handed to module hook handlers. The host owns the shape of `payload`; the
/// tags identify the origin (e.g. the collection name) for tagged subscriptions.
#[derive(Debug, Clone, Serialize)]
pub struct HookEvent {
    pub point: HookPoint,
    pub tags: Vec<String>,
    pub payload: serde_json::Value,
    pub fired_at: DateTime<Utc>,
}

impl HookEvent {
    pub fn new(point: HookPoint, tags: &[&str], payload: serde_json::Value) -> Self {
        Self {
            point,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            payload,
            fired_at: Utc::now(),
        }
    }
}

impl Tagged for HookEvent {
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

// --- Hook Surface ---

macro_rules! hook_surface {
    (
        plain {
            $( $(#[$pdoc:meta])* $pvar:ident => $pfn:ident, $pname:literal; )*
        }
        tagged {
            $( $(#[$tdoc:meta])* $tvar:ident => $tfn:ident, $tname:literal; )*
        }
    ) => {
        /// HookPoint
        ///
        /// Every lifecycle moment a module may subscribe to.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum HookPoint {
            $( $pvar, )*
            $( $tvar, )*
        }

        impl HookPoint {
            pub const ALL: &'static [HookPoint] = &[
                $( HookPoint::$pvar, )*
                $( HookPoint::$tvar, )*
            ];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( HookPoint::$pvar => $pname, )*
                    $( HookPoint::$tvar => $tname, )*
                }
            }

            /// Whether subscriptions on this point accept tags.
            pub fn is_tagged(self) -> bool {
                match self {
                    $( HookPoint::$pvar => false, )*
                    $( HookPoint::$tvar => true, )*
                }
            }

            pub(crate) fn index(self) -> usize {
                self as usize
            }
        }

        impl fmt::Display for HookPoint {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        /// AppHooks
        ///
        /// The hook surface handed to `Module::bind_hooks`. Implementors only provide
        /// `hook`; every named accessor resolves through it.
        pub trait AppHooks {
            /// Returns the hook registered for `point`.
            fn hook(&self, point: HookPoint) -> &Hook<HookEvent>;

            $(
                $(#[$pdoc])*
                fn $pfn(&self) -> &Hook<HookEvent> {
                    self.hook(HookPoint::$pvar)
                }
            )*

            $(
                $(#[$tdoc])*
                fn $tfn(&self, tags: &[&str]) -> TaggedHook<'_, HookEvent> {
                    TaggedHook::new(self.hook(HookPoint::$tvar), tags)
                }
            )*
        }
    };
}

hook_surface! {
    plain {
        /// Triggered when initializing the main application resources.
        Bootstrap => on_bootstrap, "bootstrap";
        /// Triggered when the app is being terminated (e.g. on SIGTERM).
        Terminate => on_terminate, "terminate";
        /// Triggered on every backup creation.
        BackupCreate => on_backup_create, "backup_create";
        /// Triggered before a backup restore.
        BackupRestore => on_backup_restore, "backup_restore";

        /// Triggered on every mail send.
        MailerSend => on_mailer_send, "mailer_send";

        /// Triggered when a realtime SSE client connects.
        RealtimeConnectRequest => on_realtime_connect_request, "realtime_connect_request";
        /// Triggered before a realtime message is sent to a client.
        RealtimeMessageSend => on_realtime_message_send, "realtime_message_send";
        /// Triggered when a client changes its realtime subscriptions.
        RealtimeSubscribeRequest => on_realtime_subscribe_request, "realtime_subscribe_request";

        SettingsListRequest => on_settings_list_request, "settings_list_request";
        SettingsUpdateRequest => on_settings_update_request, "settings_update_request";
        /// Triggered every time the app settings are reloaded.
        SettingsReload => on_settings_reload, "settings_reload";

        CollectionsListRequest => on_collections_list_request, "collections_list_request";
        CollectionViewRequest => on_collection_view_request, "collection_view_request";
        CollectionCreateRequest => on_collection_create_request, "collection_create_request";
        CollectionUpdateRequest => on_collection_update_request, "collection_update_request";
        CollectionDeleteRequest => on_collection_delete_request, "collection_delete_request";
        CollectionsImportRequest => on_collections_import_request, "collections_import_request";

        /// Triggered on every batch request.
        BatchRequest => on_batch_request, "batch_request";
    }
    tagged {
        /// Triggered every time a model is validated. Tags are collection names.
        ModelValidate => on_model_validate, "model_validate";
        ModelCreate => on_model_create, "model_create";
        ModelCreateExecute => on_model_create_execute, "model_create_execute";
        ModelAfterCreateSuccess => on_model_after_create_success, "model_after_create_success";
        ModelAfterCreateError => on_model_after_create_error, "model_after_create_error";
        ModelUpdate => on_model_update, "model_update";
        ModelUpdateExecute => on_model_update_execute, "model_update_execute";
        ModelAfterUpdateSuccess => on_model_after_update_success, "model_after_update_success";
        ModelAfterUpdateError => on_model_after_update_error, "model_after_update_error";
        ModelDelete => on_model_delete, "model_delete";
        ModelDeleteExecute => on_model_delete_execute, "model_delete_execute";
        ModelAfterDeleteSuccess => on_model_after_delete_success, "model_after_delete_success";
        ModelAfterDeleteError => on_model_after_delete_error, "model_after_delete_error";

        /// Triggered every time a record is enriched for a client response.
        RecordEnrich => on_record_enrich, "record_enrich";
        RecordValidate => on_record_validate, "record_validate";
        RecordCreate => on_record_create, "record_create";
        RecordCreateExecute => on_record_create_execute, "record_create_execute";
        RecordAfterCreateSuccess => on_record_after_create_success, "record_after_create_success";
        RecordAfterCreateError => on_record_after_create_error, "record_after_create_error";
        RecordUpdate => on_record_update, "record_update";
        RecordUpdateExecute => on_record_update_execute, "record_update_execute";
        RecordAfterUpdateSuccess => on_record_after_update_success, "record_after_update_success";
        RecordAfterUpdateError => on_record_after_update_error, "record_after_update_error";
        RecordDelete => on_record_delete, "record_delete";
        RecordDeleteExecute => on_record_delete_execute, "record_delete_execute";
        RecordAfterDeleteSuccess => on_record_after_delete_success, "record_after_delete_success";
        RecordAfterDeleteError => on_record_after_delete_error, "record_after_delete_error";

        CollectionValidate => on_collection_validate, "collection_validate";
        CollectionCreate => on_collection_create, "collection_create";
        CollectionCreateExecute => on_collection_create_execute, "collection_create_execute";
        CollectionAfterCreateSuccess => on_collection_after_create_success, "collection_after_create_success";
        CollectionAfterCreateError => on_collection_after_create_error, "collection_after_create_error";
        CollectionUpdate => on_collection_update, "collection_update";
        CollectionUpdateExecute => on_collection_update_execute, "collection_update_execute";
        CollectionAfterUpdateSuccess => on_collection_after_update_success, "collection_after_update_success";
        CollectionAfterUpdateError => on_collection_after_update_error, "collection_after_update_error";
        CollectionDelete => on_collection_delete, "collection_delete";
        CollectionDeleteExecute => on_collection_delete_execute, "collection_delete_execute";
        CollectionAfterDeleteSuccess => on_collection_after_delete_success, "collection_after_delete_success";
        CollectionAfterDeleteError => on_collection_after_delete_error, "collection_after_delete_error";

        MailerRecordAuthAlertSend => on_mailer_record_auth_alert_send, "mailer_record_auth_alert_send";
        MailerRecordPasswordResetSend => on_mailer_record_password_reset_send, "mailer_record_password_reset_send";
        MailerRecordVerificationSend => on_mailer_record_verification_send, "mailer_record_verification_send";
        MailerRecordEmailChangeSend => on_mailer_record_email_change_send, "mailer_record_email_change_send";
        MailerRecordOtpSend => on_mailer_record_otp_send, "mailer_record_otp_send";

        FileDownloadRequest => on_file_download_request, "file_download_request";
        FileTokenRequest => on_file_token_request, "file_token_request";

        /// Triggered on every successful auth response (password, OTP, refresh...).
        RecordAuthRequest => on_record_auth_request, "record_auth_request";
        RecordAuthWithPasswordRequest => on_record_auth_with_password_request, "record_auth_with_password_request";
        RecordAuthRefreshRequest => on_record_auth_refresh_request, "record_auth_refresh_request";
        RecordRequestPasswordResetRequest => on_record_request_password_reset_request, "record_request_password_reset_request";
        RecordConfirmPasswordResetRequest => on_record_confirm_password_reset_request, "record_confirm_password_reset_request";
        RecordRequestVerificationRequest => on_record_request_verification_request, "record_request_verification_request";
        RecordConfirmVerificationRequest => on_record_confirm_verification_request, "record_confirm_verification_request";
        RecordRequestEmailChangeRequest => on_record_request_email_change_request, "record_request_email_change_request";
        RecordConfirmEmailChangeRequest => on_record_confirm_email_change_request, "record_confirm_email_change_request";
        RecordRequestOtpRequest => on_record_request_otp_request, "record_request_otp_request";
        RecordAuthWithOtpRequest => on_record_auth_with_otp_request, "record_auth_with_otp_request";

        RecordsListRequest => on_records_list_request, "records_list_request";
        RecordViewRequest => on_record_view_request, "record_view_request";
        RecordCreateRequest => on_record_create_request, "record_create_request";
        RecordUpdateRequest => on_record_update_request, "record_update_request";
        RecordDeleteRequest => on_record_delete_request, "record_delete_request";
    }
}
