fn main() {
    talon::board::init();
    talon::uci::run();
}
