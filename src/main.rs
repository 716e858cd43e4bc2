fn main() {
    card_scan_lib::run()
}
