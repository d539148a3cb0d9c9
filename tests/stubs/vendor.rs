//! Canned vendor responses for one day of data (2024-05-01, Boise local).

pub const SOLCAST_BODY: &str = r#"
{
    "estimated_actuals": [
        {"pv_estimate": 0.0, "period_end": "2024-05-01T12:30:00.0000000Z", "period": "PT30M"},
        {"pv_estimate": 1.0124, "period_end": "2024-05-01T13:00:00.0000000Z", "period": "PT30M"},
        {"pv_estimate": 2.4667, "period_end": "2024-05-01T13:30:00.0000000Z", "period": "PT30M"}
    ]
}
"#;

pub const POWER_BODY: &str = r#"
{
    "power": {
        "timeUnit": "QUARTER_OF_AN_HOUR",
        "unit": "W",
        "values": [
            {"date": "2024-05-01 06:00:00", "value": 1500.0},
            {"date": "2024-05-01 06:15:00", "value": 2000.0},
            {"date": "2024-05-01 06:30:00", "value": 2500.5}
        ]
    }
}
"#;

pub const ENERGY_BODY: &str = r#"
{
    "energy": {
        "timeUnit": "QUARTER_OF_AN_HOUR",
        "unit": "Wh",
        "values": [
            {"date": "2024-05-01 06:00:00", "value": 375.0},
            {"date": "2024-05-01 06:15:00", "value": 500.0}
        ]
    }
}
"#;

pub const ENERGY_BODY_BAD_UNIT: &str = r#"
{
    "energy": {
        "timeUnit": "QUARTER_OF_AN_HOUR",
        "unit": "kWh",
        "values": []
    }
}
"#;

pub const TELEMETRY_BODY: &str = r#"
{
    "data": {
        "count": 2,
        "telemetries": [
            {
                "date": "2024-05-01 06:00:00",
                "totalActivePower": 1520.5,
                "dcVoltage": 390.2,
                "powerLimit": 100.0,
                "totalEnergy": 12345678.0,
                "temperature": 41.2,
                "inverterMode": "MPPT",
                "operationMode": 0,
                "L1Data": {
                    "acCurrent": 6.3,
                    "acVoltage": 241.1,
                    "acFrequency": 60.01,
                    "apparentPower": 1530.0,
                    "activePower": 1520.5,
                    "reactivePower": 120.0,
                    "cosPhi": 0.99
                }
            },
            {
                "date": "2024-05-01 06:04:59",
                "inverterMode": "MPPT",
                "operationMode": 0,
                "L1Data": {"acVoltage": 240.8}
            }
        ]
    }
}
"#;

pub const TELEMETRY_SENSOR_NAMES: [&str; 15] = [
    "totalActivePower",
    "dcVoltage",
    "groundFaultResistanceR",
    "powerLimit",
    "totalEnergy",
    "temperature",
    "inverterMode",
    "operationMode",
    "acCurrent",
    "acVoltage",
    "acFrequency",
    "apparentPower",
    "activePower",
    "reactivePower",
    "cosPhi",
];
