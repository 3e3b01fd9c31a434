use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::form::{merge_saved, project, FormScope, FormValues};
use crate::client::{
    models::{RemoteConfig, Sensor, SettingsUpdate},
    ApiError, DashboardApi,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SettingsPhase {
    Loading,
    Ready,
    Saving,
}

/// Feedback for the operator after a save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A per-sensor save went through; the surface stays open.
    Saved(String),
    SaveFailed,
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::Saved(id) => format!("Saved for {id}"),
            Notice::SaveFailed => "Failed to save settings".to_owned(),
        }
    }
}

/// What a successful save means for the settings surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Global scope saved; close the surface.
    Close,
    /// Sensor scope saved; keep the surface open.
    KeepOpen(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings have not been loaded")]
    NotLoaded,
    #[error("a save is already in progress")]
    SaveInProgress,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// State behind the settings surface: `Loading -> Ready -> Saving -> Ready`.
///
/// Holds a local copy of the backend config that is replaced on load and
/// patched after each successful save; it is never written back wholesale.
pub struct SettingsSync<A> {
    api: A,
    phase: SettingsPhase,
    config: Option<RemoteConfig>,
    sensors: Vec<Sensor>,
    form: FormValues,
    notice: Option<Notice>,
}

impl<A: DashboardApi> SettingsSync<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            phase: SettingsPhase::Loading,
            config: None,
            sensors: Vec::new(),
            form: FormValues::default(),
            notice: None,
        }
    }

    pub fn phase(&self) -> SettingsPhase {
        self.phase
    }

    pub fn config(&self) -> Option<&RemoteConfig> {
        self.config.as_ref()
    }

    /// Sensors offered as scopes, in status order.
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn form(&self) -> &FormValues {
        &self.form
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Fetch the sensor list and the config. Both must succeed.
    pub async fn fetch_remote(api: &A) -> Result<(Vec<Sensor>, RemoteConfig), ApiError> {
        let (status, config) = tokio::try_join!(api.status(), api.settings())?;
        Ok((status.sensors, config))
    }

    /// Enter `Ready` with the fetched data, or with an empty form on failure.
    pub fn apply_load(&mut self, result: Result<(Vec<Sensor>, RemoteConfig), ApiError>) {
        match result {
            Ok((sensors, config)) => {
                self.form = FormValues::from_config(&config);
                self.sensors = sensors;
                self.config = Some(config);
            }
            Err(e) => error!(error = %e, "Failed to load settings"),
        }
        self.phase = SettingsPhase::Ready;
    }

    pub async fn load(&mut self) {
        let result = Self::fetch_remote(&self.api).await;
        self.apply_load(result);
    }

    // -----------------------------------------------------------------------
    // Form edits
    // -----------------------------------------------------------------------

    /// Switch scope and re-project the scoped fields from the config.
    /// Unsaved edits to the previous scope are discarded.
    pub fn select_scope(&mut self, scope: FormScope) {
        self.form.fields = match &self.config {
            Some(config) => project(config, &scope),
            None => project(&RemoteConfig::default(), &scope),
        };
        self.form.scope = scope;
    }

    pub fn set_warning(&mut self, warning: f64) {
        self.form.fields.warning = warning;
    }

    pub fn set_critical(&mut self, critical: f64) {
        self.form.fields.critical = critical;
    }

    pub fn set_sensor_name(&mut self, name: impl Into<String>) {
        self.form.fields.sensor_name = name.into();
    }

    pub fn set_ntp_server(&mut self, server: impl Into<String>) {
        self.form.ntp_server = server.into();
    }

    pub fn set_location_auto(&mut self, auto: bool) {
        self.form.location_auto = auto;
    }

    pub fn set_led_brightness(&mut self, brightness: u8) {
        self.form.led_brightness = brightness;
    }

    /// False while the probe hardware is down and mock mode is off: the
    /// switch is locked in that state.
    pub fn mock_toggle_enabled(&self) -> bool {
        let hw_failed = self.config.as_ref().is_some_and(|c| c.hw_failed);
        self.form.mock_mode || !hw_failed
    }

    /// Flip mock mode if the switch is enabled. Returns whether it flipped.
    pub fn toggle_mock_mode(&mut self) -> bool {
        if !self.mock_toggle_enabled() {
            return false;
        }
        self.form.mock_mode = !self.form.mock_mode;
        true
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// `Ready -> Saving`. Returns the payload to submit.
    pub fn begin_save(&mut self) -> Result<SettingsUpdate, SettingsError> {
        match self.phase {
            SettingsPhase::Saving => return Err(SettingsError::SaveInProgress),
            SettingsPhase::Loading => return Err(SettingsError::NotLoaded),
            SettingsPhase::Ready => {}
        }
        if self.config.is_none() {
            return Err(SettingsError::NotLoaded);
        }

        self.phase = SettingsPhase::Saving;
        self.notice = None;
        Ok(self.form.to_update())
    }

    /// `Saving -> Ready`. On success the sent values are merged into the
    /// local config; on failure the form is left exactly as it is.
    pub fn finish_save(
        &mut self,
        update: &SettingsUpdate,
        result: Result<(), ApiError>,
    ) -> Result<SaveOutcome, SettingsError> {
        self.phase = SettingsPhase::Ready;

        match result {
            Ok(()) => {
                if let Some(config) = self.config.as_mut() {
                    merge_saved(config, update);
                }
                info!(sensor_id = %update.sensor_id, "Settings saved");

                match FormScope::parse(&update.sensor_id) {
                    FormScope::Global => Ok(SaveOutcome::Close),
                    FormScope::Sensor(id) => {
                        self.notice = Some(Notice::Saved(id.clone()));
                        Ok(SaveOutcome::KeepOpen(id))
                    }
                }
            }
            Err(e) => {
                warn!(sensor_id = %update.sensor_id, error = %e, "Failed to save settings");
                self.notice = Some(Notice::SaveFailed);
                Err(SettingsError::Api(e))
            }
        }
    }

    pub async fn save(&mut self) -> Result<SaveOutcome, SettingsError> {
        let update = self.begin_save()?;
        let result = self.api.save_settings(&update).await;
        self.finish_save(&update, result)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        client::models::Thresholds,
        testing::{snapshot, FakeApi},
    };

    fn remote() -> RemoteConfig {
        let mut c = RemoteConfig {
            ntp_server: "pool.ntp.org".into(),
            led_brightness: Some(120),
            ..Default::default()
        };
        c.location.auto = true;
        c.temp_thresholds.global = Some(Thresholds { warning: 80.0, critical: 90.0 });
        c.temp_thresholds.sensors = Some(BTreeMap::from([(
            "mock-2".to_owned(),
            Thresholds { warning: 70.0, critical: 75.0 },
        )]));
        c.sensor_names = Some(BTreeMap::from([("mock-2".to_owned(), "Intake".to_owned())]));
        c
    }

    fn api_with(config: RemoteConfig) -> FakeApi {
        let api = FakeApi::default();
        api.push_status(snapshot("14:05", &[70.0, 72.0, 71.0, 65.0]));
        api.set_settings(config);
        api
    }

    async fn loaded(config: RemoteConfig) -> (FakeApi, SettingsSync<FakeApi>) {
        let api = api_with(config);
        let mut sync = SettingsSync::new(api.clone());
        sync.load().await;
        (api, sync)
    }

    #[tokio::test]
    async fn load_populates_global_form() {
        let (_, sync) = loaded(remote()).await;

        assert_eq!(sync.phase(), SettingsPhase::Ready);
        assert_eq!(sync.sensors().len(), 4);
        let form = sync.form();
        assert_eq!(form.scope, FormScope::Global);
        assert_eq!(form.ntp_server, "pool.ntp.org");
        assert!(form.location_auto);
        assert_eq!(form.led_brightness, 120);
        assert_eq!((form.fields.warning, form.fields.critical), (80.0, 90.0));
    }

    #[tokio::test]
    async fn load_failure_leaves_defaults_and_blocks_save() {
        let api = FakeApi::default();
        let mut sync = SettingsSync::new(api.clone());
        assert_eq!(sync.phase(), SettingsPhase::Loading);

        sync.load().await;

        assert_eq!(sync.phase(), SettingsPhase::Ready);
        assert!(sync.config().is_none());
        assert_eq!(sync.form(), &FormValues::default());
        assert!(matches!(sync.save().await, Err(SettingsError::NotLoaded)));
        assert!(api.saves().is_empty());
    }

    #[tokio::test]
    async fn scope_switch_projects_and_discards_unsaved_edits() {
        let (_, mut sync) = loaded(remote()).await;

        sync.select_scope(FormScope::Sensor("mock-1".into()));
        assert_eq!(sync.form().fields.warning, 80.0);
        assert_eq!(sync.form().fields.sensor_name, "");

        sync.set_warning(55.0);
        sync.set_sensor_name("Draft");
        sync.select_scope(FormScope::Sensor("mock-2".into()));
        assert_eq!(sync.form().fields.warning, 70.0);
        assert_eq!(sync.form().fields.critical, 75.0);
        assert_eq!(sync.form().fields.sensor_name, "Intake");

        sync.select_scope(FormScope::Sensor("mock-1".into()));
        assert_eq!(sync.form().fields.warning, 80.0);
        assert_eq!(sync.form().fields.sensor_name, "");
    }

    #[tokio::test]
    async fn global_save_closes() {
        let (api, mut sync) = loaded(remote()).await;
        sync.set_warning(82.0);

        let outcome = sync.save().await.unwrap();

        assert_eq!(outcome, SaveOutcome::Close);
        assert_eq!(sync.phase(), SettingsPhase::Ready);
        let saved = api.saves();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].sensor_id, "global");
        assert_eq!(saved[0].threshold_warning, 82.0);
        assert_eq!(saved[0].sensor_name, None);
        assert_eq!(
            sync.config().unwrap().temp_thresholds.global,
            Some(Thresholds { warning: 82.0, critical: 90.0 })
        );
    }

    #[tokio::test]
    async fn sensor_save_stays_open_and_touches_only_that_scope() {
        let (api, mut sync) = loaded(remote()).await;
        let before = sync.config().unwrap().clone();

        sync.select_scope(FormScope::Sensor("mock-3".into()));
        sync.set_warning(60.0);
        sync.set_critical(66.0);
        sync.set_sensor_name("Exhaust");
        let outcome = sync.save().await.unwrap();

        assert_eq!(outcome, SaveOutcome::KeepOpen("mock-3".into()));
        assert_eq!(sync.notice(), Some(&Notice::Saved("mock-3".into())));
        assert_eq!(api.saves()[0].sensor_name.as_deref(), Some("Exhaust"));

        let after = sync.config().unwrap();
        let sensors = after.temp_thresholds.sensors.as_ref().unwrap();
        assert_eq!(sensors["mock-3"], Thresholds { warning: 60.0, critical: 66.0 });
        assert_eq!(sensors["mock-2"], before.temp_thresholds.sensors.as_ref().unwrap()["mock-2"]);
        assert_eq!(after.temp_thresholds.global, before.temp_thresholds.global);
        assert_eq!(after.sensor_names.as_ref().unwrap()["mock-3"], "Exhaust");
        assert_eq!(after.sensor_names.as_ref().unwrap()["mock-2"], "Intake");

        // Re-selecting the scope now shows the stored override.
        sync.select_scope(FormScope::Global);
        sync.select_scope(FormScope::Sensor("mock-3".into()));
        assert_eq!(sync.form().fields.warning, 60.0);
        assert_eq!(sync.form().fields.sensor_name, "Exhaust");
    }

    #[tokio::test]
    async fn failed_save_keeps_edits() {
        let (api, mut sync) = loaded(remote()).await;
        api.fail_saves(true);

        sync.select_scope(FormScope::Sensor("mock-1".into()));
        sync.set_warning(61.0);
        let err = sync.save().await.unwrap_err();

        assert!(matches!(err, SettingsError::Api(_)));
        assert_eq!(sync.phase(), SettingsPhase::Ready);
        assert_eq!(sync.notice(), Some(&Notice::SaveFailed));
        assert_eq!(sync.form().fields.warning, 61.0);
        assert_eq!(sync.form().scope, FormScope::Sensor("mock-1".into()));
        assert!(sync.config().unwrap().temp_thresholds.sensors.as_ref().unwrap().get("mock-1").is_none());
    }

    #[tokio::test]
    async fn second_begin_save_is_rejected_while_saving() {
        let (_, mut sync) = loaded(remote()).await;

        let update = sync.begin_save().unwrap();
        assert_eq!(sync.phase(), SettingsPhase::Saving);
        assert!(matches!(sync.begin_save(), Err(SettingsError::SaveInProgress)));

        // Edits made while saving are not what gets merged.
        sync.set_warning(99.0);
        sync.finish_save(&update, Ok(())).unwrap();
        assert_eq!(
            sync.config().unwrap().temp_thresholds.global.unwrap().warning,
            80.0
        );
    }

    #[tokio::test]
    async fn mock_toggle_locked_when_hardware_failed_and_mock_off() {
        let mut config = remote();
        config.hw_failed = true;
        config.mock_mode = false;
        let (_, mut sync) = loaded(config).await;

        assert!(!sync.mock_toggle_enabled());
        assert!(!sync.toggle_mock_mode());
        assert!(!sync.form().mock_mode);
    }

    #[tokio::test]
    async fn mock_toggle_off_always_allowed() {
        let mut config = remote();
        config.hw_failed = true;
        config.mock_mode = true;
        let (_, mut sync) = loaded(config).await;

        assert!(sync.toggle_mock_mode());
        assert!(!sync.form().mock_mode);
        // Now off with failed hardware: locked.
        assert!(!sync.toggle_mock_mode());
    }

    #[tokio::test]
    async fn mock_toggle_free_when_hardware_ok() {
        let (_, mut sync) = loaded(remote()).await;
        assert!(sync.toggle_mock_mode());
        assert!(sync.form().mock_mode);
        assert!(sync.toggle_mock_mode());
        assert!(!sync.form().mock_mode);
    }
}
