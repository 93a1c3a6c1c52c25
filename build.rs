fn main() {
    // Exports the ESP-IDF sysenv (paths, sdkconfig) for device builds.
    // Host builds carry no ESP-IDF, so there is nothing to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
