//! Protocol-neutral view of a received telemetry message.

use mavlink::ardupilotmega::{
    MavAutopilot, MavBatteryChargeState, MavBatteryFunction, MavBatteryMode, MavBatteryType,
    MavDistanceSensor, MavSensorOrientation, MavState, MavType,
};
use mavlink::Message;
use mavsnap_core::{MavsnapError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Key under which the message type name is stored in a snapshot.
pub const PACKET_TYPE_KEY: &str = "mavpackettype";

/// A received message: its type name plus its fields as JSON values.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryMessage {
    name: String,
    fields: Map<String, Value>,
}

impl TelemetryMessage {
    pub fn new(name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Convert a decoded MAVLink message.
    ///
    /// The `mavlink` crate serializes messages as internally tagged objects
    /// (`{"type": "ATTITUDE", ...}`); the tag is dropped in favour of
    /// [`TelemetryMessage::name`]. Field values are brought back to their
    /// wire form: enums become their numeric value, bitmasks their raw bits,
    /// and the `type` field gets its MAVLink name back from `mavtype`.
    pub fn from_mavlink<M>(message: &M) -> Result<Self>
    where
        M: Message + serde::Serialize,
    {
        let name = message.message_name();
        let Value::Object(mut tagged) = serde_json::to_value(message)? else {
            return Err(MavsnapError::NotAnObject(name.to_string()));
        };
        tagged.remove("type");

        let fields = tagged
            .into_iter()
            .map(|(key, value)| {
                let key = if key == "mavtype" { "type".to_string() } else { key };
                (key, wire_value(value))
            })
            .collect();
        Ok(Self::new(name, fields))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Snapshot form: every field plus `mavpackettype`.
    pub fn to_snapshot(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert(PACKET_TYPE_KEY.to_string(), Value::String(self.name.clone()));
        Value::Object(object)
    }
}

/// Undo the `mavlink` serde encoding of a single field.
///
/// Bitmasks arrive as `{"bits": n}` and enums as `{"type": "VARIANT"}`.
/// Enum variants outside the known set keep their name.
fn wire_value(value: Value) -> Value {
    let object = match value {
        Value::Object(object) if object.len() == 1 => object,
        other => return other,
    };

    if let Some(bits) = object.get("bits").filter(|bits| bits.is_number()) {
        return bits.clone();
    }

    let variant = object.get("type").and_then(Value::as_str).map(str::to_string);
    let tagged = Value::Object(object);
    match variant {
        Some(variant) => enum_value(&tagged).map_or(Value::String(variant), Value::from),
        None => tagged,
    }
}

/// Numeric value of a tagged enum variant, for the enums carried by the
/// polled messages.
fn enum_value(tagged: &Value) -> Option<u32> {
    macro_rules! first_match {
        ($($enum:ty),+ $(,)?) => {
            $(
                if let Ok(variant) = <$enum>::deserialize(tagged) {
                    return Some(variant as u32);
                }
            )+
        };
    }

    // variant names carry their enum's prefix, so at most one type matches
    first_match!(
        MavType,
        MavAutopilot,
        MavState,
        MavBatteryFunction,
        MavBatteryType,
        MavBatteryChargeState,
        MavBatteryMode,
        MavDistanceSensor,
        MavSensorOrientation,
    );
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::ardupilotmega::{
        MavMessage, MavModeFlag, ATTITUDE_DATA, DISTANCE_SENSOR_DATA, HEARTBEAT_DATA,
    };
    use serde_json::json;

    #[test]
    fn test_from_mavlink_attitude() {
        let msg = MavMessage::ATTITUDE(ATTITUDE_DATA {
            time_boot_ms: 1500,
            roll: 0.5,
            pitch: -0.25,
            yaw: 1.0,
            rollspeed: 0.0,
            pitchspeed: 0.0,
            yawspeed: 0.0,
        });

        let telemetry = TelemetryMessage::from_mavlink(&msg).unwrap();
        assert_eq!(telemetry.name(), "ATTITUDE");
        assert!(telemetry.fields().get("type").is_none());
        assert_eq!(telemetry.fields()["time_boot_ms"], 1500);
        assert_eq!(telemetry.fields()["roll"], 0.5);
        assert_eq!(telemetry.fields()["pitch"], -0.25);
    }

    #[test]
    fn test_from_mavlink_heartbeat_has_fields() {
        let msg = MavMessage::HEARTBEAT(HEARTBEAT_DATA::default());
        let telemetry = TelemetryMessage::from_mavlink(&msg).unwrap();
        assert_eq!(telemetry.name(), "HEARTBEAT");
        assert!(telemetry.fields().contains_key("custom_mode"));
        assert!(telemetry.fields().contains_key("mavlink_version"));
    }

    #[test]
    fn test_heartbeat_snapshot_uses_wire_values() {
        let msg = MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            custom_mode: 5,
            mavtype: MavType::MAV_TYPE_QUADROTOR,
            autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
            base_mode: MavModeFlag::from_bits_truncate(89),
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        });

        let snapshot = TelemetryMessage::from_mavlink(&msg).unwrap().to_snapshot();
        assert_eq!(
            snapshot,
            json!({
                "mavpackettype": "HEARTBEAT",
                "custom_mode": 5,
                "type": 2,
                "autopilot": 3,
                "base_mode": 89,
                "system_status": 4,
                "mavlink_version": 3,
            })
        );
    }

    #[test]
    fn test_distance_sensor_enums_are_numeric() {
        let msg = MavMessage::DISTANCE_SENSOR(DISTANCE_SENSOR_DATA {
            current_distance: 120,
            mavtype: MavDistanceSensor::MAV_DISTANCE_SENSOR_LASER,
            orientation: MavSensorOrientation::MAV_SENSOR_ROTATION_PITCH_270,
            ..DISTANCE_SENSOR_DATA::default()
        });

        let telemetry = TelemetryMessage::from_mavlink(&msg).unwrap();
        assert_eq!(telemetry.fields()["current_distance"], 120);
        assert_eq!(telemetry.fields()["type"], 0);
        assert_eq!(telemetry.fields()["orientation"], 25);
        assert!(!telemetry.fields().contains_key("mavtype"));
    }

    #[test]
    fn test_unknown_enum_variant_keeps_its_name() {
        let value = wire_value(json!({ "type": "SOME_FUTURE_ENUM_VALUE" }));
        assert_eq!(value, "SOME_FUTURE_ENUM_VALUE");
        assert_eq!(wire_value(json!({ "bits": 12 })), 12);
        assert_eq!(wire_value(json!([1, 2, 3])), json!([1, 2, 3]));
    }

    #[test]
    fn test_to_snapshot_adds_packet_type() {
        let fields = json!({ "voltage_battery": 11800 })
            .as_object()
            .cloned()
            .unwrap();
        let telemetry = TelemetryMessage::new("SYS_STATUS", fields);

        let snapshot = telemetry.to_snapshot();
        assert_eq!(snapshot[PACKET_TYPE_KEY], "SYS_STATUS");
        assert_eq!(snapshot["voltage_battery"], 11800);
        assert_eq!(snapshot.as_object().unwrap().len(), 2);
    }
}
