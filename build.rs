fn main() {
    println!("cargo:rerun-if-env-changed=AQUAGUARD_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=AQUAGUARD_WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=AQUAGUARD_BROKER_URI");
    println!("cargo:rerun-if-env-changed=AQUAGUARD_ACCESS_TOKEN");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
